use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::UserStore;
use crate::errors::AuthError;

/// In-memory user store with bcrypt-hashed passwords
#[derive(Debug)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, String>>,
    cost: u32,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Store hashing new passwords at the given bcrypt cost
    pub fn with_cost(cost: u32) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            cost,
        }
    }

    /// Seed from already-hashed passwords, as found in configuration
    pub fn from_hashes<I, U, H>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, H)>,
        U: Into<String>,
        H: Into<String>,
    {
        let users: HashMap<String, String> = users
            .into_iter()
            .map(|(u, h)| (u.into(), h.into()))
            .collect();
        info!("Loaded {} users into the memory user store", users.len());
        Self {
            users: RwLock::new(users),
            cost: bcrypt::DEFAULT_COST,
        }
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.cost;
        Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn authenticate(&self, username: &str, password: &str) -> bool {
        let Some(hash) = self.users.read().await.get(username).cloned() else {
            debug!("Authentication attempt for unknown user '{}'", username);
            return false;
        };

        // bcrypt is CPU bound, keep it off the async workers
        let password = password.to_string();
        match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                warn!("Stored hash for '{}' is unusable: {}", username, e);
                false
            }
            Err(e) => {
                warn!("Password verification task failed: {}", e);
                false
            }
        }
    }

    async fn add_user(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let hash = self.hash(password).await?;
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(AuthError::UserExists {
                username: username.to_string(),
            });
        }
        users.insert(username.to_string(), hash);
        Ok(())
    }

    async fn remove_user(&self, username: &str) -> Result<(), AuthError> {
        self.users
            .write()
            .await
            .remove(username)
            .map(|_| ())
            .ok_or_else(|| AuthError::UserNotFound {
                username: username.to_string(),
            })
    }

    async fn change_password(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let hash = self.hash(password).await?;
        let mut users = self.users.write().await;
        match users.get_mut(username) {
            Some(stored) => {
                *stored = hash;
                Ok(())
            }
            None => Err(AuthError::UserNotFound {
                username: username.to_string(),
            }),
        }
    }

    async fn list_users(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn drop_users(&self) -> Result<(), AuthError> {
        self.users.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    // Minimum bcrypt cost keeps the tests fast
    fn store() -> MemoryUserStore {
        MemoryUserStore::with_cost(4)
    }

    #[tokio::test]
    async fn test_add_and_authenticate() {
        let store = store();
        store.add_user("alice", "secret").await.unwrap();
        assert!(store.authenticate("alice", "secret").await);
        assert!(!store.authenticate("alice", "wrong").await);
        assert!(!store.authenticate("bob", "secret").await);
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = store();
        store.add_user("alice", "secret").await.unwrap();
        let err = store.add_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::UserExists { .. }));
        assert!(store.authenticate("alice", "secret").await);
    }

    #[tokio::test]
    async fn test_change_password_and_remove() {
        let store = store();
        store.add_user("alice", "secret").await.unwrap();
        store.change_password("alice", "new").await.unwrap();
        assert!(store.authenticate("alice", "new").await);
        assert!(!store.authenticate("alice", "secret").await);

        store.remove_user("alice").await.unwrap();
        assert!(!store.authenticate("alice", "new").await);
        assert!(matches!(
            store.remove_user("alice").await,
            Err(AuthError::UserNotFound { .. })
        ));
        assert!(matches!(
            store.change_password("ghost", "x").await,
            Err(AuthError::UserNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_and_drop() {
        let store = store();
        store.add_user("zed", "1").await.unwrap();
        store.add_user("amy", "2").await.unwrap();
        assert_eq!(store.list_users().await, vec!["amy", "zed"]);
        store.drop_users().await.unwrap();
        assert!(store.list_users().await.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_verification_does_not_stall_the_runtime() {
        let hash = bcrypt::hash("secret", 10).unwrap();
        let store = Arc::new(MemoryUserStore::from_hashes(vec![("alice", hash)]));

        let verifying = tokio::spawn({
            let store = store.clone();
            async move {
                let valid = store.authenticate("alice", "secret").await;
                (valid, Instant::now())
            }
        });
        let ticking = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Instant::now()
        });

        let ticked_at = ticking.await.unwrap();
        let (valid, verified_at) = verifying.await.unwrap();
        assert!(valid);
        assert!(ticked_at < verified_at);
    }

    #[tokio::test]
    async fn test_seeded_hashes() {
        let hash = bcrypt::hash("secret", 4).unwrap();
        let store = MemoryUserStore::from_hashes(vec![("alice", hash), ("broken", "not-a-hash".to_string())]);
        assert!(store.authenticate("alice", "secret").await);
        assert!(!store.authenticate("broken", "anything").await);
    }
}
