use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, PoisonError,
};

use shared::domain::RequestSeq;

/// Which completed request is allowed to write the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// A completion writes only if no later-issued request has completed
    /// before it, successfully or not. Older requests that finish late are
    /// discarded.
    #[default]
    LatestTriggered,
    /// Every completion writes; whichever resolves last is what stays shown.
    LastResolved,
}

/// Hands out request sequence numbers and gates display writes by them.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    policy: WritePolicy,
    issued: AtomicU64,
    highest_completed: Mutex<u64>,
}

impl RequestSequencer {
    pub fn new(policy: WritePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Sequence numbers start at 1 and increase with every call.
    pub fn issue(&self) -> RequestSeq {
        RequestSeq(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }

    /// Records that `seq` finished and runs `write` if it may still update
    /// the display. Every finished request must be reported here, failures
    /// included, so that an older request cannot overwrite the outcome of a
    /// newer one. Returns whether `write` ran.
    ///
    /// Recording and writing happen under one lock so two completions
    /// cannot interleave.
    pub fn complete(&self, seq: RequestSeq, write: impl FnOnce()) -> bool {
        let mut highest = self
            .highest_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.policy == WritePolicy::LastResolved || seq.0 > *highest;
        *highest = (*highest).max(seq.0);
        if current {
            write();
        }
        current
    }

    pub fn highest_completed(&self) -> Option<RequestSeq> {
        let highest = *self
            .highest_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (highest > 0).then_some(RequestSeq(highest))
    }
}
