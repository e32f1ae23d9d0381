//! # Core Traits (Ports)
//!
//! Adapters implement these to plug a transport into the store.
//! The store only ever talks to the server through them.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CreateNewsPayload, NewComment, NewsId, PageRequest, Severity, UserAccount, VoteSummary};
use crate::wire::{RawComment, RawNews};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// News and comment endpoints.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait NewsGateway: Send + Sync {
    // News Operations
    async fn list_news(&self) -> Result<Vec<RawNews>>;
    async fn get_news(&self, id: NewsId) -> Result<RawNews>;
    /// Administrative listing of soft-deleted items.
    async fn list_removed_news(&self) -> Result<Vec<RawNews>>;
    /// `None` when the server answered without a body.
    async fn create_news(&self, payload: &CreateNewsPayload) -> Result<Option<RawNews>>;
    async fn remove_news(&self, id: NewsId) -> Result<()>;

    // Comment Operations
    async fn list_comments(&self, news_id: NewsId, page: PageRequest) -> Result<Vec<RawComment>>;
    async fn create_comment(&self, comment: &NewComment) -> Result<Option<RawComment>>;
    /// Administrative delete; callers get no local state change from it.
    async fn delete_comment(&self, news_id: NewsId, comment_id: i64) -> Result<()>;
    async fn vote_summary(&self, news_id: NewsId) -> Result<VoteSummary>;
}

/// Administrative user management endpoints.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserGateway: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserAccount>>;
    async fn promote_user(&self, id: i64) -> Result<UserAccount>;
    async fn demote_user(&self, id: i64) -> Result<UserAccount>;
}

/// Where the bearer token comes from. Consulted on every request.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Sink for user-facing messages, handed to components at construction.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait Notifier: Send + Sync {
    /// Returns the identifier of the queued message.
    fn notify(&self, message: &str, severity: Severity) -> u64;
}
