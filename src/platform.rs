//! Outbound collaborator interface towards the chat platform.
//!
//! The ticket manager and the disconnect action only ever call the methods on
//! [`Platform`]. Transport concerns (authentication, rate limits, retries)
//! belong to the implementation.

pub mod access;
pub mod discord;
#[cfg(test)]
pub mod memory;

pub use access::{AccessEntry, AccessList, Permissions, Principal};

use crate::tickets::TicketNumber;
use crate::{ContainerRef, GroupRef, RoleId, SubjectId};

use std::future::Future;

/// A container as seen through the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: ContainerRef,
    pub name: String,
    /// Enclosing group, if any.
    pub group: Option<GroupRef>,
}

/// Client-agnostic message payload. Rendering is up to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Introduction of a freshly opened ticket. Carries the close affordance.
    TicketOpened {
        number: TicketNumber,
        requester: SubjectId,
        support_role: Option<RoleId>,
    },
    /// Plain replacement for an introduction that failed to post.
    IntroductionFallback {
        number: TicketNumber,
        reason: String,
    },
    /// The ticket was moved to the archive.
    TicketClosed,
    /// A scheduled disconnect went through.
    DisconnectCompleted { subject: SubjectId },
}

/// Operations the core needs from the chat platform.
pub trait Platform: Send + Sync + 'static {
    /// Short adapter name used in logs.
    fn name(&self) -> &str;

    fn find_group_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = anyhow::Result<Option<GroupRef>>> + Send;

    fn create_group(
        &self,
        name: &str,
        access: &AccessList,
    ) -> impl Future<Output = anyhow::Result<GroupRef>> + Send;

    /// Containers directly inside `group`.
    fn list_containers(
        &self,
        group: GroupRef,
    ) -> impl Future<Output = anyhow::Result<Vec<ContainerSummary>>> + Send;

    fn container_info(
        &self,
        container: ContainerRef,
    ) -> impl Future<Output = anyhow::Result<ContainerSummary>> + Send;

    fn create_container(
        &self,
        group: GroupRef,
        name: &str,
        access: &AccessList,
    ) -> impl Future<Output = anyhow::Result<ContainerRef>> + Send;

    /// Move `container` under `group`. With `sync_access` the container's own
    /// access list is replaced by the group's.
    fn move_container(
        &self,
        container: ContainerRef,
        group: GroupRef,
        sync_access: bool,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn post_message(
        &self,
        container: ContainerRef,
        notice: Notice,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Take `subject` out of voice. Returns `false` when they were not in a
    /// voice channel.
    fn disconnect_from_voice(
        &self,
        subject: SubjectId,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;
}
