use std::sync::Arc;

use study_core::Forest;
use study_core::model::UserId;

use crate::records::{decode_forest, encode_forest};
use crate::repository::{KeyValueStore, StorageError};

/// Stores one JSON document per user under `courses_<user id>`.
#[derive(Clone)]
pub struct ForestRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl ForestRepository {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn key_for(user: &UserId) -> String {
        format!("courses_{user}")
    }

    /// Load a user's forest, or `None` if nothing was ever stored for them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the document is corrupt.
    pub async fn load(&self, user: &UserId) -> Result<Option<Forest>, StorageError> {
        let key = Self::key_for(user);
        match self.kv.get(&key).await? {
            Some(raw) => decode_forest(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Load a user's forest, writing an empty document on first use.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the document is corrupt.
    pub async fn load_or_init(&self, user: &UserId) -> Result<Forest, StorageError> {
        if let Some(forest) = self.load(user).await? {
            return Ok(forest);
        }
        let empty = Forest::new();
        self.save(user, &empty).await?;
        tracing::debug!(%user, "initialized empty course forest");
        Ok(empty)
    }

    /// Replace the stored forest for `user` with `forest`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, user: &UserId, forest: &Forest) -> Result<(), StorageError> {
        let raw = encode_forest(forest)?;
        self.kv.set(&Self::key_for(user), &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyValueStore;
    use study_core::time::fixed_now;

    fn repo() -> (InMemoryKeyValueStore, ForestRepository) {
        let kv = InMemoryKeyValueStore::new();
        let repo = ForestRepository::new(Arc::new(kv.clone()));
        (kv, repo)
    }

    #[test]
    fn key_is_prefixed_with_courses() {
        assert_eq!(ForestRepository::key_for(&UserId::new("42")), "courses_42");
    }

    #[tokio::test]
    async fn first_load_writes_empty_array() {
        let (kv, repo) = repo();
        let user = UserId::new("new-user");
        assert!(repo.load(&user).await.unwrap().is_none());

        let forest = repo.load_or_init(&user).await.unwrap();
        assert!(forest.is_empty());
        assert_eq!(kv.get("courses_new-user").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let (_kv, repo) = repo();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        let mut forest = Forest::new();
        forest
            .create_course("Physics", "", fixed_now(), fixed_now())
            .unwrap();
        repo.save(&alice, &forest).await.unwrap();

        assert_eq!(repo.load(&alice).await.unwrap().unwrap().len(), 1);
        assert!(repo.load_or_init(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_loads_are_identical() {
        let (_kv, repo) = repo();
        let user = UserId::new("u");
        let mut forest = Forest::new();
        let course = forest
            .create_course("Chemistry", "atoms", fixed_now(), fixed_now())
            .unwrap();
        forest.create_subject(&course, "Bonds").unwrap();
        repo.save(&user, &forest).await.unwrap();

        let first = repo.load(&user).await.unwrap().unwrap();
        let second = repo.load(&user).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, forest);
        assert_eq!(encode_forest(&first).unwrap(), encode_forest(&second).unwrap());
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let (kv, repo) = repo();
        kv.set("courses_u", "not json").await.unwrap();
        let err = repo.load(&UserId::new("u")).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
