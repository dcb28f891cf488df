//! Support ticket lifecycle: numbering, opening and archiving private channels.
//!
//! Ticket state is never stored locally. Every request re-reads the open and
//! archived groups through the [`Platform`](crate::platform::Platform).

mod allocator;
mod manager;
mod scanner;
mod types;

pub use allocator::next_number;
pub use manager::{TicketCreation, TicketManager};
pub use scanner::{GroupListing, scan};
pub use types::{Ticket, TicketNaming, TicketNumber, TicketState};
