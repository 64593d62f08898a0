//! # Driving Ports (API - Inbound)
//!
//! The interface block processing uses to run EVM messages.

use crate::domain::entities::{BlockContext, Message, Receipt};
use crate::errors::TransitionError;
use crate::evm::meter::ResourceMeter;

/// Applies EVM messages to the ledger, one at a time.
pub trait MessageExecutor {
    /// Applies `msg` in `block`.
    ///
    /// `meter` is the host meter of this message alone. Its limit must cover
    /// `msg.gas_limit`; on success it reflects exactly the gas charged to the
    /// message. With `commit == false` the receipt is computed and every
    /// write is discarded.
    ///
    /// # Errors
    ///
    /// Validation and settlement failures. Execution reverts are not errors;
    /// they produce a receipt with `reverted = true`.
    fn apply_message(
        &mut self,
        msg: &Message,
        block: &BlockContext,
        meter: &mut ResourceMeter,
        commit: bool,
    ) -> Result<Receipt, TransitionError>;
}
