//! Authentication and system user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        CreateUser, Role, UpdateProfile, UpdateUser, User, UserClaims, UserQuery,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, user: &User, password: &str) -> bool {
        PasswordHash::new(&user.password)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Create a JWT token for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))
    }

    /// Authenticate a user by email and password, returning a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password) {
            tracing::warn!("Failed login attempt for email: {}", email);
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        if !user.is_active {
            tracing::warn!("Login attempt on deactivated account: {}", email);
            return Err(AppError::Authentication(
                "Your account has been deactivated. Please contact support.".to_string(),
            ));
        }

        let token = self.create_token(&user)?;
        tracing::info!("Successful login for user: {}", user.email);

        Ok((token, user))
    }

    /// Self-service registration: always creates a member account
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<User> {
        if self.repository.users.email_exists(email, None).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self.repository.users.username_exists(username, None).await? {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let hash = self.hash_password(password)?;
        let user = self
            .repository
            .users
            .create(username, email, &hash, Role::Member)
            .await?;

        tracing::info!("New user registered: {}", user.email);
        Ok(user)
    }

    /// Create the default administrator account if it does not exist
    pub async fn ensure_default_admin(&self) -> AppResult<()> {
        if self
            .repository
            .users
            .get_by_email(&self.config.admin_email)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let hash = self.hash_password(&self.config.admin_password)?;
        self.repository
            .users
            .create(
                &self.config.admin_username,
                &self.config.admin_email,
                &hash,
                Role::Admin,
            )
            .await?;

        tracing::info!("Created default admin user ({})", self.config.admin_email);
        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    /// Create a system user with an explicit role (admin user management)
    pub async fn create_user(&self, request: &CreateUser) -> AppResult<User> {
        if self
            .repository
            .users
            .email_exists(&request.email, None)
            .await?
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self
            .repository
            .users
            .username_exists(&request.username, None)
            .await?
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let hash = self.hash_password(&request.password)?;
        self.repository
            .users
            .create(
                &request.username,
                &request.email,
                &hash,
                request.role.unwrap_or(Role::Member),
            )
            .await
    }

    /// Update a system user (admin user management)
    pub async fn update_user(&self, id: i32, request: &UpdateUser) -> AppResult<User> {
        if let Some(ref email) = request.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
        if let Some(ref username) = request.username {
            if self
                .repository
                .users
                .username_exists(username, Some(id))
                .await?
            {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
        }

        let hash = match request.password {
            Some(ref password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository.users.update(id, request, hash).await
    }

    /// Change a user's role. The seeded admin account cannot be demoted.
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        let user = self.repository.users.get_by_id(id).await?;
        if user.email == self.config.admin_email && role != Role::Admin {
            return Err(AppError::BusinessRule(
                "The default admin account cannot be demoted".to_string(),
            ));
        }
        self.repository.users.update_role(id, role).await
    }

    /// Delete a system user. The seeded admin account cannot be deleted.
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        let user = self.repository.users.get_by_id(id).await?;
        if user.email == self.config.admin_email {
            return Err(AppError::BusinessRule(
                "The default admin account cannot be deleted".to_string(),
            ));
        }
        self.repository.users.delete(id).await
    }

    /// Update the authenticated user's own profile. Password changes require
    /// the current password.
    pub async fn update_profile(&self, id: i32, request: &UpdateProfile) -> AppResult<User> {
        let user = self.repository.users.get_by_id(id).await?;

        if let Some(ref email) = request.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
        if let Some(ref username) = request.username {
            if self
                .repository
                .users
                .username_exists(username, Some(id))
                .await?
            {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
        }

        let hash = match request.new_password {
            Some(ref new_password) => {
                let current = request.current_password.as_deref().ok_or_else(|| {
                    AppError::BadRequest(
                        "Current password is required to change password".to_string(),
                    )
                })?;
                if !self.verify_password(&user, current) {
                    return Err(AppError::Authentication(
                        "Current password is incorrect".to_string(),
                    ));
                }
                Some(self.hash_password(new_password)?)
            }
            None => None,
        };

        self.repository
            .users
            .update_profile(
                id,
                request.username.as_deref(),
                request.email.as_deref(),
                hash.as_deref(),
            )
            .await
    }
}
