//! # Logging Tracer
//!
//! Emits message start/end events through `tracing`.

use crate::domain::entities::{BlockContext, Message, Receipt};
use crate::ports::outbound::Tracer;
use tracing::info;

/// Tracer that logs every message at `info` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingTracer;

impl Tracer for LoggingTracer {
    fn on_message_start(&self, msg: &Message, block: &BlockContext) {
        info!(
            from = ?msg.from,
            to = ?msg.to,
            nonce = msg.nonce,
            gas_limit = msg.gas_limit,
            height = block.height,
            "EVM message start"
        );
    }

    fn on_message_end(&self, receipt: &Receipt) {
        info!(
            gas_used = receipt.gas_used,
            reverted = receipt.reverted,
            vm_error = %receipt.vm_error,
            logs = receipt.logs.len(),
            "EVM message end"
        );
    }
}
