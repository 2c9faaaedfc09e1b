//! Confirmation-dialog collaborator interface.
//!
//! Destructive bulk operations await a boolean from a dialog owned by the
//! presentation layer; this crate only defines the seam.

use async_trait::async_trait;

/// Asks the user to approve a destructive operation.
#[async_trait]
pub trait ConfirmDialog: Send + Sync {
    /// Present `message` and return `true` if the user approves.
    async fn confirm(&self, message: &str) -> bool;
}

/// Approves every confirmation.  For headless consumers and tests.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmDialog for AutoConfirm {
    async fn confirm(&self, _message: &str) -> bool {
        true
    }
}
