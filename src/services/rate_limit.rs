//! Fixed-window rate limiting for authentication endpoints
//!
//! Attempts are tracked in memory per client IP, the way the original
//! deployment did. A multi-node deployment would need a shared store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::{
    config::RateLimitConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    attempts: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimitService {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a login attempt for this client, rejecting once the window is full
    pub fn check_login(&self, client_ip: &str) -> AppResult<()> {
        self.check(
            format!("login:{}", client_ip),
            self.config.login_attempts,
            Duration::from_secs(self.config.login_window_secs),
            "login",
        )
    }

    /// Record a registration attempt for this client
    pub fn check_register(&self, client_ip: &str) -> AppResult<()> {
        self.check(
            format!("register:{}", client_ip),
            self.config.register_attempts,
            Duration::from_secs(self.config.register_window_secs),
            "register",
        )
    }

    fn check(
        &self,
        key: String,
        max_attempts: usize,
        window: Duration,
        kind: &str,
    ) -> AppResult<()> {
        let now = Instant::now();
        let mut attempts = self
            .attempts
            .lock()
            .map_err(|_| AppError::Internal("Rate limiter lock poisoned".to_string()))?;

        // Evict clients whose attempts all fell out of every window, so the
        // map does not grow with each distinct IP ever seen
        let horizon = Duration::from_secs(
            self.config
                .login_window_secs
                .max(self.config.register_window_secs),
        );
        attempts.retain(|_, hits| {
            hits.retain(|t| now.duration_since(*t) < horizon);
            !hits.is_empty()
        });

        let entry = attempts.entry(key).or_default();
        entry.retain(|t| now.duration_since(*t) < window);

        if entry.len() >= max_attempts {
            tracing::warn!("Rate limit hit for {} attempts", kind);
            return Err(AppError::RateLimited(format!(
                "Too many {} attempts. Please try again later.",
                kind
            )));
        }

        entry.push(now);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(login_attempts: usize, window_secs: u64) -> RateLimitService {
        RateLimitService::new(RateLimitConfig {
            login_attempts,
            login_window_secs: window_secs,
            register_attempts: 3,
            register_window_secs: 3600,
        })
    }

    #[test]
    fn admits_exactly_the_configured_attempts() {
        let limiter = service(5, 300);
        for _ in 0..5 {
            assert!(limiter.check_login("10.0.0.1").is_ok());
        }
        assert!(limiter.check_login("10.0.0.1").is_err());
    }

    #[test]
    fn limits_are_per_client() {
        let limiter = service(1, 300);
        assert!(limiter.check_login("10.0.0.1").is_ok());
        assert!(limiter.check_login("10.0.0.2").is_ok());
        assert!(limiter.check_login("10.0.0.1").is_err());
    }

    #[test]
    fn login_and_register_windows_are_independent() {
        let limiter = service(1, 300);
        assert!(limiter.check_login("10.0.0.1").is_ok());
        assert!(limiter.check_register("10.0.0.1").is_ok());
        assert!(limiter.check_login("10.0.0.1").is_err());
    }

    #[test]
    fn stale_clients_are_evicted() {
        let limiter = RateLimitService::new(RateLimitConfig {
            login_attempts: 5,
            login_window_secs: 0,
            register_attempts: 3,
            register_window_secs: 0,
        });
        for i in 0..50 {
            assert!(limiter.check_login(&format!("10.0.0.{}", i)).is_ok());
        }
        // Zero-length windows: each check sweeps every earlier client away,
        // leaving at most the entry just recorded
        assert!(limiter.tracked_clients() <= 1);
    }

    #[test]
    fn expired_attempts_are_pruned() {
        // Zero-length window: every prior attempt is already stale
        let limiter = service(1, 0);
        assert!(limiter.check_login("10.0.0.1").is_ok());
        assert!(limiter.check_login("10.0.0.1").is_ok());
    }
}
