//! Life Giver: a Discord assistant with two stateful cores.
//!
//! - [`scheduler`] arms one cancellable deferred action per subject (used for
//!   timed voice disconnects).
//! - [`tickets`] numbers, opens and archives private support channels.
//!
//! Both talk to the chat platform only through the [`platform::Platform`]
//! trait. [`assistant::Assistant`] is the facade the Discord glue calls into.

pub mod assistant;
pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod scheduler;
pub mod tickets;

pub use assistant::Assistant;
pub use config::Config;
pub use error::{Error, Result};

/// Opaque identity of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(pub u64);

/// Identity of a platform role (e.g. the support team).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(pub u64);

/// Reference to a container group (a channel category on Discord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupRef(pub u64);

/// Reference to a container (a text channel on Discord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerRef(pub u64);

macro_rules! display_id {
    ($($ty:ident),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_id!(SubjectId, RoleId, GroupRef, ContainerRef);
