//! Member management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, MemberQuery, MemberShort, UpdateMember},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    /// Search members with pagination
    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<MemberShort>, i64)> {
        self.repository.members.search(query).await
    }

    /// Create a new member
    pub async fn create(&self, request: &CreateMember) -> AppResult<Member> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self
            .repository
            .members
            .email_exists(&request.email, None)
            .await?
        {
            return Err(AppError::Conflict(
                "A member with this email already exists".to_string(),
            ));
        }

        self.repository.members.create(request).await
    }

    /// Update an existing member
    pub async fn update(&self, id: i32, request: &UpdateMember) -> AppResult<Member> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.repository.members.get_by_id(id).await?;

        if let Some(ref email) = request.email {
            if self
                .repository
                .members
                .email_exists(email, Some(id))
                .await?
            {
                return Err(AppError::Conflict(
                    "A member with this email already exists".to_string(),
                ));
            }
        }

        self.repository.members.update(id, request).await
    }

    /// Delete a member
    pub async fn delete(&self, id: i32, force: bool) -> AppResult<()> {
        self.repository.members.get_by_id(id).await?;
        self.repository.members.delete(id, force).await
    }
}
