//! Fixed-token session validator for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Accepts only the tokens it was built with.
///
/// ```ignore
/// let validator = MockSessionValidator::new().with_test_user("tok", "uid-1");
/// ```
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    outage: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.write().unwrap().insert(token.into(), user);
        self
    }

    /// `user_id` with a verified `<user_id>@test.example.com` address.
    pub fn with_test_user(self, token: impl Into<String>, user_id: &str) -> Self {
        let id = UserId::new(user_id).unwrap();
        let email = format!("{user_id}@test.example.com");
        self.with_user(token, AuthenticatedUser::new(id, Some(email), true))
    }

    /// Every call fails with `error` until `clear_error`.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.outage.write().unwrap() = Some(error);
        self
    }

    pub fn clear_error(&self) {
        self.outage.write().unwrap().take();
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self.outage.read().unwrap().as_ref() {
            return Err(error.clone());
        }
        let tokens = self.tokens.read().unwrap();
        tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}
