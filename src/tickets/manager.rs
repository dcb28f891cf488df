//! Opens and archives ticket containers.

use super::allocator::next_number;
use super::scanner::{GroupListing, scan};
use super::types::{Ticket, TicketNaming, TicketNumber, TicketState};
use crate::config::TicketConfig;
use crate::error::DegradedCreation;
use crate::platform::{AccessList, Notice, Platform};
use crate::{ContainerRef, Error, GroupRef, Result, RoleId, SubjectId};

use tokio::sync::Mutex;

use std::sync::Arc;

/// Outcome of a successful ticket creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCreation {
    pub ticket: Ticket,
    /// Set when the container exists but its introduction could not be posted.
    pub degraded: Option<DegradedCreation>,
}

/// Ticket lifecycle manager.
///
/// Holds no ticket state of its own. Creations and closes are serialized
/// through a single lane, so two requesters can never be allocated the same
/// number by this process and the groups are never created twice.
pub struct TicketManager<P> {
    platform: Arc<P>,
    naming: TicketNaming,
    open_group: String,
    archived_group: String,
    support_role: Option<RoleId>,
    lane: Mutex<()>,
}

impl<P: Platform> TicketManager<P> {
    pub fn new(platform: Arc<P>, config: &TicketConfig) -> Self {
        Self {
            platform,
            naming: TicketNaming::new(config.name_prefix.clone(), config.number_width),
            open_group: config.open_group.clone(),
            archived_group: config.archived_group.clone(),
            support_role: config.support_role(),
            lane: Mutex::new(()),
        }
    }

    pub fn naming(&self) -> &TicketNaming {
        &self.naming
    }

    /// The number the next ticket would get. Read-only and unserialized; the
    /// answer may be stale by the time a ticket is created.
    pub async fn next_number(&self) -> Result<TicketNumber> {
        let open = GroupListing::fetch(&*self.platform, &self.open_group).await?;
        let archived = GroupListing::fetch(&*self.platform, &self.archived_group).await?;
        next_number(&scan(&self.naming, open.as_ref(), archived.as_ref()))
    }

    /// Open a private ticket container for `requester`.
    ///
    /// Failing to reach or create the groups or the container is fatal. A
    /// failed introduction is reported through [`TicketCreation::degraded`] and
    /// the container is left in place.
    pub async fn create_ticket(&self, requester: SubjectId) -> Result<TicketCreation> {
        let lane = self.lane.lock().await;

        let open_group = self.ensure_group(&self.open_group, &AccessList::new()).await?;
        let open = GroupListing::fetch_group(&*self.platform, open_group).await?;
        let archived = GroupListing::fetch(&*self.platform, &self.archived_group).await?;
        let number = next_number(&scan(&self.naming, Some(&open), archived.as_ref()))?;

        let name = self.naming.container_name(number);
        let access = AccessList::ticket(requester, self.support_role);
        let container = self
            .platform
            .create_container(open_group, &name, &access)
            .await
            .map_err(|error| Error::unavailable("create ticket container", error))?;
        drop(lane);

        tracing::info!(
            ticket = %number,
            %requester,
            %container,
            platform = self.platform.name(),
            "ticket opened"
        );

        let introduction = Notice::TicketOpened {
            number,
            requester,
            support_role: self.support_role,
        };
        let degraded = match self.platform.post_message(container, introduction).await {
            Ok(()) => None,
            Err(error) => {
                let reason = format!("{error:#}");
                tracing::warn!(%error, ticket = %number, %container, "failed to post ticket introduction");
                let fallback = Notice::IntroductionFallback {
                    number,
                    reason: reason.clone(),
                };
                if let Err(error) = self.platform.post_message(container, fallback).await {
                    tracing::debug!(%error, ticket = %number, "fallback introduction failed too");
                }
                Some(DegradedCreation { number, reason })
            }
        };

        Ok(TicketCreation {
            ticket: Ticket {
                number,
                owner: Some(requester),
                state: TicketState::Open,
                container,
            },
            degraded,
        })
    }

    /// Move an open ticket into the archive group and revoke per-ticket access.
    ///
    /// The container's placement is checked again inside the lane, so of two
    /// racing closes for the same ticket only one archives it.
    pub async fn close_ticket(&self, ticket: Ticket) -> Result<Ticket> {
        if ticket.state == TicketState::Archived {
            return Err(Error::AlreadyArchived(ticket.number));
        }

        let lane = self.lane.lock().await;
        let archive = self
            .ensure_group(&self.archived_group, &AccessList::archive(self.support_role))
            .await?;
        let current = self
            .platform
            .container_info(ticket.container)
            .await
            .map_err(|error| Error::unavailable("look up ticket container", error))?;
        if current.group == Some(archive) {
            return Err(Error::AlreadyArchived(ticket.number));
        }
        self.platform
            .move_container(ticket.container, archive, true)
            .await
            .map_err(|error| Error::unavailable("archive ticket container", error))?;
        drop(lane);

        tracing::info!(ticket = %ticket.number, container = %ticket.container, "ticket archived");

        if let Err(error) = self
            .platform
            .post_message(ticket.container, Notice::TicketClosed)
            .await
        {
            tracing::warn!(%error, ticket = %ticket.number, "failed to post closure notice");
        }

        Ok(Ticket {
            state: TicketState::Archived,
            ..ticket
        })
    }

    /// Rebuild a ticket from its container.
    pub async fn resolve(&self, container: ContainerRef) -> Result<Ticket> {
        let info = self
            .platform
            .container_info(container)
            .await
            .map_err(|error| Error::unavailable("look up ticket container", error))?;

        let number = match self.naming.parse(&info.name) {
            Some(number) if number > 0 => TicketNumber(number),
            _ => return Err(Error::NotATicket(container)),
        };

        let Some(group) = info.group else {
            return Err(Error::NotATicket(container));
        };
        let state = if Some(group) == self.find_group(&self.open_group).await? {
            TicketState::Open
        } else if Some(group) == self.find_group(&self.archived_group).await? {
            TicketState::Archived
        } else {
            return Err(Error::NotATicket(container));
        };

        Ok(Ticket {
            number,
            owner: None,
            state,
            container,
        })
    }

    async fn find_group(&self, name: &str) -> Result<Option<GroupRef>> {
        self.platform
            .find_group_by_name(name)
            .await
            .map_err(|error| Error::unavailable("look up ticket group", error))
    }

    /// Find the group called `name`, creating it with `access` if absent.
    async fn ensure_group(&self, name: &str, access: &AccessList) -> Result<GroupRef> {
        if let Some(group) = self.find_group(name).await? {
            return Ok(group);
        }
        let group = self
            .platform
            .create_group(name, access)
            .await
            .map_err(|error| Error::unavailable("create ticket group", error))?;
        tracing::info!(group = %group, name, "created ticket group");
        Ok(group)
    }
}
