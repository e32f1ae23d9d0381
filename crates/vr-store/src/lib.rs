//! # vr-store
//!
//! Client-side state for verity: the news reconciliation store, the
//! notification queue and the administrative user directory. Everything
//! here talks to the server only through the `vr-core` ports.

pub mod news;
pub mod notifications;
pub mod users;

pub use news::{NewsStore, SubmitOutcome};
pub use notifications::{NotificationQueue, DEFAULT_TTL};
pub use users::UserDirectory;
