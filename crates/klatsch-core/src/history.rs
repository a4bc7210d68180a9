//! Room Directory and Identity Provider contracts, plus the history
//! fetcher.
//!
//! Both collaborators are external CRUD services reached over
//! request/response; the engine only depends on these traits. All calls
//! carry a bearer credential supplied by the Identity Provider; the
//! credential is owned by the implementation, never stored in the engine.

use async_trait::async_trait;

use crate::{
    error::EngineError,
    room::{CurrentUser, Message, RoomCode},
};

/// One page of persisted history for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    /// Current room topic.
    pub topic: String,
    /// Messages in this page. Order is not guaranteed; the reconciler
    /// sorts on ingestion.
    pub messages: Vec<Message>,
}

/// External room directory: code creation, membership, and history pages.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Create a fresh room and return its code.
    async fn create_room_code(&self) -> Result<RoomCode, EngineError>;

    /// Validate membership of the given room.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the code does not resolve
    /// - `EngineError::Unauthorized` if the caller is not a member
    /// - `EngineError::Transient` on network/5xx conditions
    async fn join_room_code(&self, code: &RoomCode) -> Result<(), EngineError>;

    /// Fetch one page of history (pure read, no side effects).
    ///
    /// `page` is 1-based. Page 1 additionally carries the room topic.
    ///
    /// # Errors
    ///
    /// Same classification as [`RoomDirectory::join_room_code`].
    async fn fetch_page(
        &self,
        code: &RoomCode,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, EngineError>;
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the signed-in user.
    ///
    /// # Errors
    ///
    /// - `EngineError::Unauthenticated` if no identity can be resolved;
    ///   the caller should abandon the room view and hand control to the
    ///   external auth flow
    async fn profile(&self) -> Result<CurrentUser, EngineError>;
}

/// Default number of messages per history page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Paginated history retrieval for one room.
///
/// The engine fetches page 1 on room entry to obtain both the topic and
/// the initial backlog. Deeper pages are supported for future extension
/// but never prefetched proactively.
#[derive(Debug, Clone)]
pub struct HistoryFetcher<D> {
    directory: D,
    page_size: u32,
}

impl<D: RoomDirectory> HistoryFetcher<D> {
    /// Create a fetcher with the default page size.
    pub fn new(directory: D) -> Self {
        Self { directory, page_size: DEFAULT_PAGE_SIZE }
    }

    /// Create a fetcher with an explicit page size.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidInput` if `page_size` is zero
    pub fn with_page_size(directory: D, page_size: u32) -> Result<Self, EngineError> {
        if page_size == 0 {
            return Err(EngineError::InvalidInput {
                reason: "page size must be positive".to_string(),
            });
        }
        Ok(Self { directory, page_size })
    }

    /// Configured page size.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch the first page: topic plus initial backlog.
    pub async fn initial_backlog(&self, room: &RoomCode) -> Result<HistoryPage, EngineError> {
        self.page(room, 1).await
    }

    /// Fetch an arbitrary 1-based page.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidInput` if `page` is zero
    /// - Directory errors as classified by [`RoomDirectory::fetch_page`]
    pub async fn page(&self, room: &RoomCode, page: u32) -> Result<HistoryPage, EngineError> {
        if page == 0 {
            return Err(EngineError::InvalidInput {
                reason: "history pages are 1-based".to_string(),
            });
        }

        self.directory.fetch_page(room, page, self.page_size).await
    }
}
