//! In-memory room directory and identity provider.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use klatsch_core::{
    CurrentUser, EngineError, HistoryPage, IdentityProvider, RoomCode, RoomDirectory,
};

use crate::backend::MemoryBackend;

/// Directory and identity provider backed by [`MemoryBackend`].
///
/// Failure injection: [`MemoryDirectory::fail_fetches`] makes the next N
/// history fetches fail with a transient error, and
/// [`MemoryDirectory::sign_out`] turns every identity-bearing call into
/// `Unauthenticated`.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    backend: MemoryBackend,
    profile: Arc<Mutex<Option<CurrentUser>>>,
    failing_fetches: Arc<AtomicU32>,
}

impl MemoryDirectory {
    /// Directory with a signed-in user.
    #[must_use]
    pub fn signed_in(backend: MemoryBackend, user: CurrentUser) -> Self {
        Self {
            backend,
            profile: Arc::new(Mutex::new(Some(user))),
            failing_fetches: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Directory with no resolvable identity.
    #[must_use]
    pub fn signed_out(backend: MemoryBackend) -> Self {
        Self {
            backend,
            profile: Arc::new(Mutex::new(None)),
            failing_fetches: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Drop the identity; subsequent calls fail with `Unauthenticated`.
    pub fn sign_out(&self) {
        if let Ok(mut profile) = self.profile.lock() {
            *profile = None;
        }
    }

    /// Make the next `count` history fetches fail transiently.
    pub fn fail_fetches(&self, count: u32) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    fn current_user(&self) -> Result<CurrentUser, EngineError> {
        self.profile
            .lock()
            .ok()
            .and_then(|p| p.clone())
            .ok_or(EngineError::Unauthenticated)
    }
}

#[async_trait]
impl RoomDirectory for MemoryDirectory {
    async fn create_room_code(&self) -> Result<RoomCode, EngineError> {
        self.current_user()?;
        Ok(self.backend.create_room("New room"))
    }

    async fn join_room_code(&self, code: &RoomCode) -> Result<(), EngineError> {
        self.current_user()?;
        if self.backend.room_exists(code) {
            Ok(())
        } else {
            Err(EngineError::NotFound { code: code.as_str().to_string() })
        }
    }

    async fn fetch_page(
        &self,
        code: &RoomCode,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, EngineError> {
        self.current_user()?;
        if page == 0 {
            return Err(EngineError::InvalidInput { reason: "pages are 1-based".to_string() });
        }

        if self.failing_fetches.load(Ordering::SeqCst) > 0 {
            self.failing_fetches.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::Transient { reason: "injected fetch failure".to_string() });
        }

        let topic = self
            .backend
            .topic(code)
            .ok_or_else(|| EngineError::NotFound { code: code.as_str().to_string() })?;
        let all = self.backend.messages(code).unwrap_or_default();

        // Page 1 is the most recent slice; deeper pages reach further back.
        let total = all.len();
        let size = page_size as usize;
        let end = total.saturating_sub((page as usize - 1) * size);
        let start = end.saturating_sub(size);

        Ok(HistoryPage { topic, messages: all[start..end].to_vec() })
    }
}

#[async_trait]
impl IdentityProvider for MemoryDirectory {
    async fn profile(&self) -> Result<CurrentUser, EngineError> {
        self.current_user()
    }
}
