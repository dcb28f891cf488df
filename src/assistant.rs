//! Inbound facade called by the chat glue.
//!
//! Each request returns a result or an error for the glue to render; nothing
//! here formats user-facing text.

use crate::config::{Config, DisconnectConfig};
use crate::platform::{Notice, Platform};
use crate::scheduler::DeferredScheduler;
use crate::tickets::{Ticket, TicketCreation, TicketManager};
use crate::{ContainerRef, Error, Result, SubjectId};

use std::sync::Arc;
use std::time::Duration;

/// The assistant's stateful core over one platform.
pub struct Assistant<P> {
    platform: Arc<P>,
    tickets: TicketManager<P>,
    disconnects: DeferredScheduler,
    limits: DisconnectConfig,
}

impl<P: Platform> Assistant<P> {
    pub fn new(platform: Arc<P>, config: &Config) -> Self {
        Self {
            tickets: TicketManager::new(platform.clone(), &config.tickets),
            platform,
            disconnects: DeferredScheduler::new(),
            limits: config.disconnect.clone(),
        }
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn tickets(&self) -> &TicketManager<P> {
        &self.tickets
    }

    pub fn disconnects(&self) -> &DeferredScheduler {
        &self.disconnects
    }

    pub async fn request_ticket_create(&self, requester: SubjectId) -> Result<TicketCreation> {
        self.tickets.create_ticket(requester).await
    }

    /// Archive the ticket living in `container`.
    pub async fn request_ticket_close(&self, container: ContainerRef) -> Result<Ticket> {
        let ticket = self.tickets.resolve(container).await?;
        self.tickets.close_ticket(ticket).await
    }

    /// Take `subject` out of voice after `delay`, replacing any pending
    /// disconnect for them. When `announce_in` is set, a completion notice is
    /// posted there once the disconnect went through.
    ///
    /// Returns `true` when an earlier pending disconnect was replaced.
    pub fn request_schedule_disconnect(
        &self,
        subject: SubjectId,
        delay: Duration,
        announce_in: Option<ContainerRef>,
    ) -> Result<bool> {
        if delay.is_zero() {
            return Err(Error::InvalidDelay("delay must be positive".into()));
        }
        let max_delay = self.limits.max_delay();
        if delay > max_delay {
            return Err(Error::InvalidDelay(format!(
                "delay of {}s exceeds the maximum of {}s",
                delay.as_secs(),
                max_delay.as_secs()
            )));
        }

        let platform = self.platform.clone();
        let action = async move {
            if !platform.disconnect_from_voice(subject).await? {
                tracing::debug!(%subject, "subject already left voice");
                return Ok(());
            }
            if let Some(container) = announce_in
                && let Err(error) = platform
                    .post_message(container, Notice::DisconnectCompleted { subject })
                    .await
            {
                tracing::debug!(%error, %subject, "failed to announce disconnect");
            }
            Ok::<(), anyhow::Error>(())
        };

        let replaced = self.disconnects.schedule(subject, delay, action);
        tracing::info!(%subject, delay_secs = delay.as_secs(), replaced, "disconnect scheduled");
        Ok(replaced)
    }

    /// Returns `false` when no disconnect was pending for `subject`.
    pub fn request_cancel_disconnect(&self, subject: SubjectId) -> bool {
        let cancelled = self.disconnects.cancel(subject);
        if cancelled {
            tracing::info!(%subject, "disconnect cancelled");
        }
        cancelled
    }

    /// Drop every pending disconnect.
    pub fn shutdown(&self) {
        let cancelled = self.disconnects.cancel_all();
        tracing::info!(cancelled, "assistant shut down");
    }
}
