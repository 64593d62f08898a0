//! # Host Resource Meter
//!
//! The host ledger gives every message its own gas meter, which may already
//! carry host-side charges when the message reaches the engine. The EVM keeps
//! a separate count while the message runs; the two are reconciled exactly
//! once, in [`reconcile_resource_meter`], which overwrites the meter with the
//! message's gas. Block-level totals are the host's to accumulate from the
//! per-message meters.

use tracing::debug;

/// Per-message host gas meter. Never shared across messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceMeter {
    limit: u64,
    consumed: u64,
}

impl ResourceMeter {
    /// Creates a meter with nothing consumed.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// A meter that never runs out.
    #[must_use]
    pub const fn infinite() -> Self {
        Self::new(u64::MAX)
    }

    /// Meter limit.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas consumed so far.
    #[must_use]
    pub const fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Gas left before the limit.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    /// Charges host-side gas (ledger reads/writes outside the EVM).
    ///
    /// Returns false and leaves the meter untouched if the limit would be
    /// exceeded.
    pub fn consume(&mut self, amount: u64, descriptor: &str) -> bool {
        match self.consumed.checked_add(amount) {
            Some(total) if total <= self.limit => {
                debug!(amount, descriptor, total, "host gas consumed");
                self.consumed = total;
                true
            }
            _ => false,
        }
    }
}

/// Resets the host meter so that it reflects exactly `correct_consumed`.
///
/// The EVM gas count is authoritative for the message; anything the host
/// charged during execution is superseded.
///
/// # Panics
///
/// Panics if `correct_consumed` is below what the meter already consumed,
/// or above the meter limit. Either means the two meters disagree and
/// continuing would diverge state across nodes.
pub fn reconcile_resource_meter(meter: &mut ResourceMeter, correct_consumed: u64) {
    assert!(
        correct_consumed >= meter.consumed,
        "gas meter reconciliation would go backwards: consumed {}, reconciled {}",
        meter.consumed,
        correct_consumed
    );
    assert!(
        correct_consumed <= meter.limit,
        "gas meter overflow: reconciled {} exceeds limit {}",
        correct_consumed,
        meter.limit
    );
    meter.consumed = correct_consumed;
}
