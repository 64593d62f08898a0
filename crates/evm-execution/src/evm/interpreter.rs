//! # Native Interpreter
//!
//! Reference [`Interpreter`] that covers everything the engine needs without
//! a bytecode VM: value transfers, precompile calls and contract creation
//! (the init code is deposited as the contract's code).
//!
//! Calls into accounts that hold code fail: executing bytecode is the job of
//! a full EVM plugged in through the same port.

use crate::domain::entities::Message;
use crate::domain::services::compute_contract_address;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::PrecompileError;
use crate::evm::execution_config::ExecutionConfig;
use crate::evm::gas::{code_deposit_cost, MAX_CODE_SIZE};
use crate::evm::precompiles::abi::encode_revert_reason;
use crate::ports::outbound::{Host, Interpreter, InterpreterResult};
use tracing::{debug, trace};

/// Failure raised when value cannot be moved.
pub const ERR_INSUFFICIENT_BALANCE: &str = "insufficient balance for transfer";
/// Failure raised when a call targets contract code.
pub const ERR_CODE_EXECUTION: &str = "contract code execution not supported";
/// Failure raised when the creation address is taken.
pub const ERR_ADDRESS_COLLISION: &str = "contract address collision";
/// Failure raised when gas runs out.
pub const ERR_OUT_OF_GAS: &str = "out of gas";
/// Failure raised when deployed code is too large.
pub const ERR_MAX_CODE_SIZE: &str = "max code size exceeded";

/// Interpreter for value transfers, precompiles and code deposit.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeInterpreter;

impl NativeInterpreter {
    fn move_value(
        config: &ExecutionConfig,
        host: &mut dyn Host,
        from: &Address,
        to: &Address,
        value: U256,
    ) -> bool {
        if value.is_zero() {
            return true;
        }
        host.state()
            .transfer(from, to, &config.evm_denom, value)
            .is_ok()
    }

    fn call(
        config: &ExecutionConfig,
        msg: &Message,
        to: Address,
        gas: u64,
        host: &mut dyn Host,
    ) -> InterpreterResult {
        if let Some(result) =
            host.call_precompile(&to, msg.data.as_slice(), &msg.from, msg.value, gas, false)
        {
            return match result {
                Ok(output) => InterpreterResult::success(output.gas_used, output.output),
                Err(err) => {
                    debug!(precompile = ?to, %err, "precompile reverted");
                    let mut failed = InterpreterResult::failure(gas, err.to_string());
                    if !matches!(err, PrecompileError::OutOfGas) {
                        failed.return_data = Bytes::from(encode_revert_reason(&err.to_string()));
                    }
                    failed
                }
            };
        }

        if !host.state().code(&to).is_empty() {
            return InterpreterResult::failure(0, ERR_CODE_EXECUTION);
        }

        if !Self::move_value(config, host, &msg.from, &to, msg.value) {
            return InterpreterResult::failure(0, ERR_INSUFFICIENT_BALANCE);
        }

        trace!(from = ?msg.from, to = ?to, value = %msg.value, "value transfer");
        InterpreterResult::success(0, Bytes::new())
    }

    fn create(
        config: &ExecutionConfig,
        msg: &Message,
        gas: u64,
        host: &mut dyn Host,
    ) -> InterpreterResult {
        let address = compute_contract_address(msg.from, msg.nonce);
        let state = host.state();
        if !state.code(&address).is_empty() || state.nonce(&address) != 0 {
            return InterpreterResult::failure(gas, ERR_ADDRESS_COLLISION);
        }

        if !Self::move_value(config, host, &msg.from, &address, msg.value) {
            return InterpreterResult::failure(0, ERR_INSUFFICIENT_BALANCE);
        }

        let code = msg.data.clone();
        if code.len() > MAX_CODE_SIZE {
            return InterpreterResult::failure(gas, ERR_MAX_CODE_SIZE);
        }
        let deposit = code_deposit_cost(code.len());
        if deposit > gas {
            return InterpreterResult::failure(gas, ERR_OUT_OF_GAS);
        }

        let state = host.state();
        state.set_nonce(&address, 1);
        state.set_code(&address, code);
        debug!(contract = ?address, deposit, "contract deployed");

        InterpreterResult {
            created: Some(address),
            ..InterpreterResult::success(deposit, Bytes::new())
        }
    }
}

impl Interpreter for NativeInterpreter {
    fn execute(
        &self,
        config: &ExecutionConfig,
        msg: &Message,
        gas: u64,
        host: &mut dyn Host,
    ) -> InterpreterResult {
        match msg.to {
            Some(to) => Self::call(config, msg, to, gas, host),
            None => Self::create(config, msg, gas, host),
        }
    }
}
