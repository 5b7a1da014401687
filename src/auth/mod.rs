//! Authentication authority
//!
//! Decides whether decoded request credentials identify a known client:
//! Basic credentials against a [`UserStore`], bearer tokens against the
//! configured API tokens.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AuthError;
use crate::security::Credentials;

pub mod memory;

pub use memory::MemoryUserStore;

/// User management and password verification
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> bool;
    async fn add_user(&self, username: &str, password: &str) -> Result<(), AuthError>;
    async fn remove_user(&self, username: &str) -> Result<(), AuthError>;
    async fn change_password(&self, username: &str, password: &str) -> Result<(), AuthError>;
    /// User names, sorted
    async fn list_users(&self) -> Vec<String>;
    async fn drop_users(&self) -> Result<(), AuthError>;
}

/// Who a request was authenticated as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(String),
    ApiToken,
    /// Authentication is not configured
    Anonymous,
}

#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    api_tokens: Arc<HashSet<String>>,
}

impl Authenticator {
    pub fn new<I, S>(users: Arc<dyn UserStore>, api_tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users,
            api_tokens: Arc::new(
                api_tokens
                    .into_iter()
                    .map(Into::into)
                    .filter(|t: &String| !t.is_empty())
                    .collect(),
            ),
        }
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Resolve credentials to a principal. Absent or invalid credentials
    /// yield `None`.
    pub async fn authorize(&self, credentials: &Credentials) -> Option<Principal> {
        match credentials {
            Credentials::Basic { username, password } => self
                .users
                .authenticate(username, password)
                .await
                .then(|| Principal::User(username.clone())),
            Credentials::Bearer(token) => self
                .api_tokens
                .contains(token)
                .then_some(Principal::ApiToken),
            Credentials::None => None,
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("api_tokens", &self.api_tokens.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn authenticator() -> Authenticator {
        let store = MemoryUserStore::with_cost(4);
        store.add_user("alice", "secret").await.unwrap();
        Authenticator::new(Arc::new(store), vec!["abc123", ""])
    }

    #[tokio::test]
    async fn test_basic_credentials() {
        let auth = authenticator().await;
        let good = Credentials::Basic {
            username: "alice".into(),
            password: "secret".into(),
        };
        assert_eq!(
            auth.authorize(&good).await,
            Some(Principal::User("alice".to_string()))
        );
        let bad = Credentials::Basic {
            username: "alice".into(),
            password: "nope".into(),
        };
        assert_eq!(auth.authorize(&bad).await, None);
    }

    #[tokio::test]
    async fn test_bearer_tokens() {
        let auth = authenticator().await;
        assert_eq!(
            auth.authorize(&Credentials::Bearer("abc123".into())).await,
            Some(Principal::ApiToken)
        );
        assert_eq!(auth.authorize(&Credentials::Bearer("zzz".into())).await, None);
        assert_eq!(auth.authorize(&Credentials::Bearer(String::new())).await, None);
        assert_eq!(auth.authorize(&Credentials::None).await, None);
    }
}
