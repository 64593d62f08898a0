//! # Execution Host
//!
//! The [`Host`] handed to the interpreter: scoped state, block hashes and
//! precompile dispatch for one message.

use crate::domain::entities::BlockContext;
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::PrecompileError;
use crate::evm::hash_resolver::HashResolver;
use crate::evm::precompiles::{PrecompileCall, PrecompileOutput, PrecompileSet};
use crate::ports::outbound::{HeaderStore, Host, StateDb};

/// Host for one message execution.
pub struct ExecutionHost<'a, S: StateDb> {
    state: &'a mut S,
    headers: &'a dyn HeaderStore,
    block: &'a BlockContext,
    precompiles: &'a PrecompileSet,
}

impl<'a, S: StateDb> ExecutionHost<'a, S> {
    /// Creates a host.
    pub fn new(
        state: &'a mut S,
        headers: &'a dyn HeaderStore,
        block: &'a BlockContext,
        precompiles: &'a PrecompileSet,
    ) -> Self {
        Self {
            state,
            headers,
            block,
            precompiles,
        }
    }
}

impl<S: StateDb> Host for ExecutionHost<'_, S> {
    fn block(&self) -> &BlockContext {
        self.block
    }

    fn block_hash(&mut self, height: u64) -> Hash {
        HashResolver::new(self.headers).resolve(self.block, height)
    }

    fn state(&mut self) -> &mut dyn StateDb {
        &mut *self.state
    }

    fn call_precompile(
        &mut self,
        address: &Address,
        input: &[u8],
        caller: &Address,
        value: U256,
        gas_limit: u64,
        is_static: bool,
    ) -> Option<Result<PrecompileOutput, PrecompileError>> {
        let call = PrecompileCall {
            input,
            caller: *caller,
            value,
            gas_limit,
            is_static,
            block_time: self.block.time,
        };
        self.precompiles.dispatch(address, &call, &mut *self.state)
    }
}
