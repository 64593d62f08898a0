//! # Execution Metrics
//!
//! Prometheus metrics for the state transition engine.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! evm-execution = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `evm_messages_applied_total` - Counter of messages that produced a receipt
//! - `evm_messages_reverted_total` - Counter of receipts with `reverted = true`
//! - `evm_messages_rejected_total` - Counter of rejected messages (by reason)
//! - `evm_gas_used` - Histogram of gas charged per message
//! - `evm_precompile_table_size` - Gauge of reachable bridge precompiles

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Messages that produced a receipt
    pub static ref MESSAGES_APPLIED: IntCounter = register_int_counter!(
        "evm_messages_applied_total",
        "Total number of EVM messages applied"
    )
    .expect("Failed to create MESSAGES_APPLIED metric");

    /// Receipts with a failed execution
    pub static ref MESSAGES_REVERTED: IntCounter = register_int_counter!(
        "evm_messages_reverted_total",
        "Total number of EVM messages whose execution reverted"
    )
    .expect("Failed to create MESSAGES_REVERTED metric");

    /// Messages rejected before a receipt, labeled by reason
    pub static ref MESSAGES_REJECTED: IntCounterVec = register_int_counter_vec!(
        "evm_messages_rejected_total",
        "Total number of EVM messages rejected",
        &["reason"]
    )
    .expect("Failed to create MESSAGES_REJECTED metric");

    /// Gas charged per message
    pub static ref GAS_USED: Histogram = register_histogram!(
        "evm_gas_used",
        "Gas charged per EVM message",
        vec![21_000.0, 50_000.0, 100_000.0, 250_000.0, 1_000_000.0, 5_000_000.0]
    )
    .expect("Failed to create GAS_USED metric");

    /// Bridge precompiles reachable in the current block
    pub static ref PRECOMPILE_TABLE_SIZE: IntGauge = register_int_gauge!(
        "evm_precompile_table_size",
        "Number of reachable ERC20 bridge precompiles"
    )
    .expect("Failed to create PRECOMPILE_TABLE_SIZE metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a receipt
#[cfg(feature = "metrics")]
pub fn record_message_applied(gas_used: u64, reverted: bool) {
    MESSAGES_APPLIED.inc();
    GAS_USED.observe(gas_used as f64);
    if reverted {
        MESSAGES_REVERTED.inc();
    }
}

/// Record a rejected message
#[cfg(feature = "metrics")]
pub fn record_message_rejected(reason: &str) {
    MESSAGES_REJECTED.with_label_values(&[reason]).inc();
}

/// Update the precompile table size
#[cfg(feature = "metrics")]
pub fn set_precompile_table_size(size: usize) {
    PRECOMPILE_TABLE_SIZE.set(i64::try_from(size).unwrap_or(i64::MAX));
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

/// Record a receipt (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_message_applied(_gas_used: u64, _reverted: bool) {}

/// Record a rejected message (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_message_rejected(_reason: &str) {}

/// Update the precompile table size (no-op)
#[cfg(not(feature = "metrics"))]
pub fn set_precompile_table_size(_size: usize) {}
