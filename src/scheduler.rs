//! Deferred actions: at most one armed, cancellable action per subject.
//!
//! Every armed action is a tokio task waiting on `sleep_until(deadline)` or its
//! [`CancellationToken`], whichever comes first. The live table maps a subject
//! to its current handle. Firing and cancelling both have to remove the entry
//! from the table under the lock before they act, so for a given handle exactly
//! one of them wins: either the action runs, or `cancel` returns `true` and the
//! action never starts.

use crate::{Error, SubjectId};

use futures::FutureExt as _;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stand-in deadline offset for delays that overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Live record of one armed action.
#[derive(Debug)]
struct Handle {
    /// Distinguishes this handle from earlier ones for the same subject.
    generation: u64,
    token: CancellationToken,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    table: Mutex<HashMap<SubjectId, Handle>>,
    next_generation: AtomicU64,
}

impl Inner {
    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<SubjectId, Handle>> {
        self.table.lock().expect("deferred table lock poisoned")
    }

    /// Take ownership of the firing transition. Fails if the handle was
    /// cancelled or replaced in the meantime.
    fn claim(&self, subject: SubjectId, generation: u64) -> bool {
        let mut table = self.table();
        match table.get(&subject) {
            Some(handle) if handle.generation == generation && !handle.token.is_cancelled() => {
                table.remove(&subject);
                true
            }
            _ => false,
        }
    }
}

/// Table of armed deferred actions, keyed by subject.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct DeferredScheduler {
    inner: Arc<Inner>,
}

impl DeferredScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` to run once after `delay`.
    ///
    /// A live handle for the same subject is cancelled first and its action
    /// never runs. Returns `true` when such a handle was replaced.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, subject: SubjectId, delay: Duration, action: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let now = Instant::now();
        let deadline = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);

        let mut table = self.inner.table();
        let previous = table.insert(
            subject,
            Handle {
                generation,
                token: token.clone(),
                deadline,
            },
        );
        // Spawned while the table is held: the task cannot claim before the
        // entry is in place.
        tokio::spawn(run_deferred(
            self.inner.clone(),
            subject,
            generation,
            token,
            deadline,
            action,
        ));
        drop(table);

        let replaced = match previous {
            Some(previous) => {
                previous.token.cancel();
                true
            }
            None => false,
        };

        tracing::debug!(
            %subject,
            delay_ms = delay.as_millis() as u64,
            replaced,
            "deferred action armed"
        );
        replaced
    }

    /// Disarm the subject's handle. Returns `false` when nothing was armed.
    ///
    /// Once this returns `true` the action is guaranteed not to run.
    pub fn cancel(&self, subject: SubjectId) -> bool {
        let removed = self.inner.table().remove(&subject);
        match removed {
            Some(handle) => {
                handle.token.cancel();
                tracing::debug!(%subject, "deferred action cancelled");
                true
            }
            None => false,
        }
    }

    /// Disarm every handle. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Handle> = self.inner.table().drain().map(|(_, handle)| handle).collect();
        for handle in &drained {
            handle.token.cancel();
        }
        drained.len()
    }

    pub fn is_armed(&self, subject: SubjectId) -> bool {
        self.inner.table().contains_key(&subject)
    }

    /// When the subject's action is due, if one is armed.
    pub fn deadline(&self, subject: SubjectId) -> Option<Instant> {
        self.inner.table().get(&subject).map(|handle| handle.deadline)
    }

    pub fn armed_count(&self) -> usize {
        self.inner.table().len()
    }
}

async fn run_deferred<F>(
    inner: Arc<Inner>,
    subject: SubjectId,
    generation: u64,
    token: CancellationToken,
    deadline: Instant,
    action: F,
) where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => return,
        _ = tokio::time::sleep_until(deadline) => {}
    }

    if !inner.claim(subject, generation) {
        return;
    }

    let outcome = match AssertUnwindSafe(action).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("deferred action panicked")),
    };

    match outcome {
        Ok(()) => tracing::info!(%subject, "deferred action completed"),
        Err(source) => {
            let error = Error::ActionExecution { subject, source };
            tracing::warn!(%error, "deferred action failed");
        }
    }
}
