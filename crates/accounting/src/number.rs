//! Account-number candidate generation.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;

use pinledger_core::{AccountNumber, DomainResult};

/// Candidates tried (pre-check collisions and insert conflicts combined)
/// before account creation gives up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 5;

/// Produces account-number candidates: a millisecond time component that
/// never goes backwards within the process, followed by a 4-digit random
/// suffix, keeping the last [`AccountNumber::LEN`] digits.
///
/// Uniqueness is not guaranteed here; the store's unique constraint is the
/// authority and callers retry on collision.
#[derive(Debug, Default)]
pub struct AccountNumberAllocator {
    last_millis: AtomicU64,
}

impl AccountNumberAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_candidate(&self) -> DomainResult<AccountNumber> {
        let millis = self.tick(Utc::now().timestamp_millis().max(0) as u64);
        let suffix = rand::thread_rng().gen_range(0..10_000u16);
        compose(millis, suffix)
    }

    fn tick(&self, now: u64) -> u64 {
        let mut prev = self.last_millis.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_millis.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

fn compose(millis: u64, suffix: u16) -> DomainResult<AccountNumber> {
    let raw = format!("{millis}{suffix:04}");
    let tail = if raw.len() > AccountNumber::LEN {
        &raw[raw.len() - AccountNumber::LEN..]
    } else {
        raw.as_str()
    };
    AccountNumber::parse(format!("{tail:0>width$}", width = AccountNumber::LEN))
}
