//! Next-number allocation over a scan.

use super::types::TicketNumber;
use crate::{Error, Result};

/// One past the highest scanned suffix, or [`TicketNumber::FIRST`] when
/// nothing was scanned. Gaps are never filled.
///
/// Fails with [`Error::NumbersExhausted`] when the highest suffix has no
/// successor; an existing number is never handed out again.
///
/// This is a read-then-decide computation. Callers that allocate concurrently
/// must serialize around it; [`TicketManager`](super::TicketManager) does.
pub fn next_number(scanned: &[u64]) -> Result<TicketNumber> {
    match scanned.iter().max() {
        None => Ok(TicketNumber::FIRST),
        Some(&highest) => highest
            .checked_add(1)
            .map(TicketNumber)
            .ok_or(Error::NumbersExhausted { highest }),
    }
}
