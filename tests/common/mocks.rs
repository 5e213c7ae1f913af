//! Recording collaborators for testing
//!
//! Stand-ins for the invitation notifier so tests can observe what would
//! have been delivered.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use appzero_accounts::services::InviteNotifier;

/// A delivered invitation
#[derive(Debug, Clone, PartialEq)]
pub struct SentInvitation {
    pub recipient: String,
    pub url: String,
}

/// Notifier that records every invitation it is asked to send
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentInvitation>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentInvitation> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<SentInvitation> {
        self.sent.lock().unwrap().last().cloned()
    }

    /// Token carried by the most recent invitation link
    pub fn last_token(&self) -> Option<String> {
        self.last().and_then(|sent| {
            sent.url
                .split_once("token=")
                .map(|(_, token)| urlencoding::decode(token).unwrap().into_owned())
        })
    }
}

#[async_trait]
impl InviteNotifier for RecordingNotifier {
    async fn send_invitation(&self, recipient_email: &str, invitation_url: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentInvitation {
            recipient: recipient_email.to_string(),
            url: invitation_url.to_string(),
        });
        Ok(())
    }
}

/// Notifier whose deliveries always fail
#[derive(Debug, Default, Clone)]
pub struct FailingNotifier;

#[async_trait]
impl InviteNotifier for FailingNotifier {
    async fn send_invitation(&self, _recipient_email: &str, _invitation_url: &str) -> Result<()> {
        Err(anyhow!("mail relay unavailable"))
    }
}
