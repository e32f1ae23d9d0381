//! # User Directory
//!
//! Administrative view of platform accounts: list, promote, demote.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};
use vr_core::{Notifier, Result, Severity, UserAccount, UserGateway};

pub const LOAD_USERS_FAILED: &str = "Failed to load user list.";
pub const PROMOTE_FAILED: &str = "Failed to promote user.";
pub const DEMOTE_FAILED: &str = "Failed to demote user.";

#[derive(Default)]
struct UserState {
    users: Vec<UserAccount>,
    loading: bool,
}

pub struct UserDirectory {
    gateway: Arc<dyn UserGateway>,
    notifier: Option<Arc<dyn Notifier>>,
    state: Mutex<UserState>,
}

#[derive(Clone, Copy)]
enum RoleChange {
    Promote,
    Demote,
}

impl UserDirectory {
    pub fn new(gateway: Arc<dyn UserGateway>) -> Self {
        Self { gateway, notifier: None, state: Mutex::new(UserState::default()) }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn state(&self) -> MutexGuard<'_, UserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, message: &str, severity: Severity) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message, severity);
        }
    }

    pub fn users(&self) -> Vec<UserAccount> {
        self.state().users.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Replaces the list with the server's. Fails soft: the old list is kept
    /// and an error notification is pushed.
    pub async fn fetch_all(&self) {
        self.state().loading = true;
        let result = self.gateway.list_users().await;

        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(users) => state.users = users,
            Err(e) => {
                drop(state);
                warn!(error = %e, "loading users failed");
                self.notify(LOAD_USERS_FAILED, Severity::Error);
            }
        }
    }

    pub async fn promote(&self, id: i64) -> Result<UserAccount> {
        self.change_role(id, RoleChange::Promote).await
    }

    pub async fn demote(&self, id: i64) -> Result<UserAccount> {
        self.change_role(id, RoleChange::Demote).await
    }

    /// Swaps the updated account into the list in place. Fails loud.
    async fn change_role(&self, id: i64, change: RoleChange) -> Result<UserAccount> {
        let result = match change {
            RoleChange::Promote => self.gateway.promote_user(id).await,
            RoleChange::Demote => self.gateway.demote_user(id).await,
        };

        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                error!(user_id = id, error = %e, "changing user role failed");
                let message = match change {
                    RoleChange::Promote => PROMOTE_FAILED,
                    RoleChange::Demote => DEMOTE_FAILED,
                };
                self.notify(message, Severity::Error);
                return Err(e);
            }
        };

        let replaced = {
            let mut state = self.state();
            match state.users.iter_mut().find(|u| u.id == id) {
                Some(slot) => {
                    *slot = updated.clone();
                    true
                }
                None => false,
            }
        };
        if replaced {
            let message = match change {
                RoleChange::Promote => format!("User {} promoted to MEMBER.", updated.username),
                RoleChange::Demote => format!("User {} demoted to READER.", updated.username),
            };
            info!(user_id = id, "{message}");
            self.notify(&message, Severity::Success);
        }
        Ok(updated)
    }
}
