//! Ticket records and container naming.

use crate::{ContainerRef, SubjectId};

/// Positive ticket number, rendered as a fixed-width suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketNumber(pub u64);

impl TicketNumber {
    pub const FIRST: Self = Self(1);

    pub fn get(self) -> u64 {
        self.0
    }

    /// Zero-padded to `width` digits. Wider numbers are never truncated.
    pub fn padded(self, width: usize) -> String {
        format!("{:0width$}", self.0)
    }
}

impl std::fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state. `Open -> Archived` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    Open,
    Archived,
}

impl TicketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Open => "open",
            TicketState::Archived => "archived",
        }
    }
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One support interaction, bound to exactly one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub number: TicketNumber,
    /// Requester. Unknown for tickets rebuilt from the platform.
    pub owner: Option<SubjectId>,
    pub state: TicketState,
    pub container: ContainerRef,
}

/// Maps ticket numbers to container names and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketNaming {
    prefix: String,
    width: usize,
}

impl TicketNaming {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    pub fn container_name(&self, number: TicketNumber) -> String {
        format!("{}{}", self.prefix, number.padded(self.width))
    }

    /// Suffix of a recognized container name: the prefix followed by one or
    /// more ASCII digits, padded or not. Anything else is not a ticket.
    ///
    /// Suffixes too large for a `u64` saturate to `u64::MAX`, so they still
    /// count towards the highest number.
    pub fn parse(&self, name: &str) -> Option<u64> {
        let digits = name.strip_prefix(self.prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        // All-digit input only fails to parse on overflow.
        Some(digits.parse().unwrap_or(u64::MAX))
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl Default for TicketNaming {
    fn default() -> Self {
        Self::new("ticket-", 4)
    }
}
