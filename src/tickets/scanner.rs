//! Extracts ticket numbers from the open and archived groups.

use super::types::TicketNaming;
use crate::platform::{ContainerSummary, Platform};
use crate::{Error, GroupRef, Result};

/// Snapshot of one group's containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupListing {
    pub group: GroupRef,
    pub containers: Vec<ContainerSummary>,
}

impl GroupListing {
    /// Look up the group called `name` and list its containers. A missing
    /// group is `Ok(None)`; an unreachable one is `ResourceUnavailable`.
    pub async fn fetch<P: Platform>(platform: &P, name: &str) -> Result<Option<Self>> {
        let Some(group) = platform
            .find_group_by_name(name)
            .await
            .map_err(|error| Error::unavailable("look up ticket group", error))?
        else {
            return Ok(None);
        };
        Self::fetch_group(platform, group).await.map(Some)
    }

    pub async fn fetch_group<P: Platform>(platform: &P, group: GroupRef) -> Result<Self> {
        let containers = platform
            .list_containers(group)
            .await
            .map_err(|error| Error::unavailable("list ticket containers", error))?;
        Ok(Self { group, containers })
    }
}

/// Suffixes of every recognized container in both groups. Order is not
/// meaningful and duplicates are kept.
pub fn scan(
    naming: &TicketNaming,
    open: Option<&GroupListing>,
    archived: Option<&GroupListing>,
) -> Vec<u64> {
    [open, archived]
        .into_iter()
        .flatten()
        .flat_map(|listing| &listing.containers)
        .filter_map(|container| naming.parse(&container.name))
        .collect()
}
