// src/pipeline/publish.rs

//! Idempotent message publishing.
//!
//! Decides whether to edit the existing remote messages for a feed or
//! to create fresh ones, and cleans up handles that are no longer used.
//! Re-publishing identical content with the previously returned handles
//! edits in place instead of spawning new messages.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::PublishAction;

/// Outbound message transport: create, edit, and delete by handle.
///
/// Implemented by the webhook client; mocked in tests.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Create a new message and return its handle.
    async fn create(&self, destination: &str, content: &str) -> Result<String>;

    /// Edit an existing message. Returns `Ok(false)` when the remote
    /// rejects the edit (e.g. the message was deleted upstream).
    async fn edit(&self, destination: &str, handle: &str, content: &str) -> Result<bool>;

    /// Delete a message by handle.
    async fn delete(&self, destination: &str, handle: &str) -> Result<()>;
}

/// Edit-or-create publisher over a message transport.
pub struct Publisher<'a> {
    transport: &'a dyn MessageTransport,
}

impl<'a> Publisher<'a> {
    pub fn new(transport: &'a dyn MessageTransport) -> Self {
        Self { transport }
    }

    /// Publish rendered chunks for a feed, reusing prior handles when possible.
    ///
    /// Single chunk with an existing handle edits in place; anything else
    /// creates new messages and deletes the prior ones best-effort.
    pub async fn publish(
        &self,
        destination: &str,
        prior_handles: &[String],
        chunks: &[String],
        force_new: bool,
    ) -> Result<(Vec<String>, PublishAction)> {
        if chunks.len() == 1 && !prior_handles.is_empty() && !force_new {
            match self
                .transport
                .edit(destination, &prior_handles[0], &chunks[0])
                .await
            {
                Ok(true) => {
                    // Surplus handles from an earlier multi-chunk publish.
                    self.delete_best_effort(destination, &prior_handles[1..])
                        .await;
                    return Ok((vec![prior_handles[0].clone()], PublishAction::Edited));
                }
                Ok(false) => {
                    log::warn!("Edit rejected for handle {}; reposting", prior_handles[0]);
                }
                Err(error) => {
                    log::warn!(
                        "Edit failed for handle {}: {}; reposting",
                        prior_handles[0],
                        error
                    );
                }
            }
        }

        let mut new_handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            new_handles.push(self.transport.create(destination, chunk).await?);
        }

        let orphaned: Vec<String> = prior_handles
            .iter()
            .filter(|h| !new_handles.contains(h))
            .cloned()
            .collect();
        self.delete_best_effort(destination, &orphaned).await;

        Ok((new_handles, PublishAction::Created))
    }

    /// Delete handles, logging failures instead of propagating them.
    async fn delete_best_effort(&self, destination: &str, handles: &[String]) {
        for handle in handles {
            if let Err(error) = self.transport.delete(destination, handle).await {
                log::warn!("Failed to delete message {handle}: {error}");
            }
        }
    }
}
