//! Invitation link delivery
//!
//! The core only builds invitation URLs; delivering them belongs to an
//! `InviteNotifier`. The default notifier just records that a link is ready.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait InviteNotifier: Send + Sync {
    async fn send_invitation(&self, recipient_email: &str, invitation_url: &str) -> Result<()>;
}

/// Notifier that logs the recipient. The URL carries the token and is never logged.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl InviteNotifier for LogNotifier {
    async fn send_invitation(&self, recipient_email: &str, _invitation_url: &str) -> Result<()> {
        info!(recipient = recipient_email, "Invitation link ready for delivery");
        Ok(())
    }
}
