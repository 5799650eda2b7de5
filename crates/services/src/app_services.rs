use std::sync::Arc;

use storage::repository::Storage;
use tokio::sync::Mutex;

use crate::course_store::CourseStore;
use crate::error::AppServicesError;
use crate::identity::Session;
use crate::Clock;

/// Assembles the identity provider and the course store over one backend.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<Session>,
    store: Arc<Mutex<CourseStore>>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a throwaway in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        Self {
            session: Arc::new(Session::new()),
            store: Arc::new(Mutex::new(CourseStore::new(clock, Arc::clone(&storage.kv)))),
        }
    }

    #[must_use]
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn store(&self) -> Arc<Mutex<CourseStore>> {
        Arc::clone(&self.store)
    }

    /// Bring the store in line with whoever the session says is logged in.
    ///
    /// Returns whether the active user changed.
    pub async fn follow_session(&self) -> bool {
        let mut identity = self.session.subscribe();
        self.store.lock().await.sync_identity(&mut identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::UserId;
    use study_core::time::{fixed_clock, fixed_now};

    #[tokio::test]
    async fn follow_session_scopes_store_to_logged_in_user() {
        let services = AppServices::in_memory(fixed_clock());
        assert!(!services.follow_session().await);

        services.session().login(UserId::new("u1"));
        assert!(services.follow_session().await);
        {
            let store = services.store();
            let mut store = store.lock().await;
            store
                .create_course("Algebra", "", fixed_now())
                .await
                .unwrap();
            assert_eq!(store.snapshot().len(), 1);
        }

        services.session().logout();
        assert!(services.follow_session().await);
        assert!(services.store().lock().await.snapshot().is_empty());
    }
}
