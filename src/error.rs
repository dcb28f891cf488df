//! Error taxonomy shared by the scheduler, the ticket manager and the facade.

use crate::tickets::TicketNumber;
use crate::{ContainerRef, SubjectId};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the glue layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A container group or container could not be read, created or moved.
    /// Fatal to the triggering request.
    #[error("resource unavailable while trying to {operation}: {source:#}")]
    ResourceUnavailable {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A deferred action failed when it fired. Only ever logged, the handle
    /// is cleaned up regardless.
    #[error("deferred action for subject {subject} failed: {source:#}")]
    ActionExecution {
        subject: SubjectId,
        #[source]
        source: anyhow::Error,
    },

    #[error("container {0} is not a ticket")]
    NotATicket(ContainerRef),

    #[error("ticket {0} is already archived")]
    AlreadyArchived(TicketNumber),

    /// The highest existing ticket number has no successor.
    #[error("no ticket number left after {highest}")]
    NumbersExhausted { highest: u64 },

    #[error("invalid delay: {0}")]
    InvalidDelay(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wrap a collaborator failure that made a resource unreachable.
    pub(crate) fn unavailable(operation: &'static str, source: anyhow::Error) -> Self {
        Self::ResourceUnavailable { operation, source }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {0} referenced by config is not set")]
    MissingEnv(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A ticket was created but its introduction could not be posted.
///
/// Carried alongside the ticket as a warning, never returned as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ticket {number} created but its introduction was not posted: {reason}")]
pub struct DegradedCreation {
    pub number: TicketNumber,
    pub reason: String,
}
