use study_core::model::UserId;
use tokio::sync::watch;

/// Identity provider: tracks who is logged in and notifies on change.
#[derive(Debug)]
pub struct Session {
    active: watch::Sender<Option<UserId>>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        let (active, _rx) = watch::channel(None);
        Self { active }
    }

    pub fn login(&self, user: UserId) {
        tracing::info!(%user, "user logged in");
        self.active.send_replace(Some(user));
    }

    pub fn logout(&self) {
        if let Some(user) = self.active.send_replace(None) {
            tracing::info!(%user, "user logged out");
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<UserId> {
        self.active.borrow().clone()
    }

    /// Receiver that observes every login and logout.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.active.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
