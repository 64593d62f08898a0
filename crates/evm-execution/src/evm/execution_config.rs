//! # Execution Config
//!
//! Everything a single transition needs to know about its environment,
//! resolved up front. Built once per transition and never mutated.

use crate::config::{AccessControl, ExecutionParams};
use crate::domain::entities::BlockContext;
use crate::domain::rules::ChainRules;
use crate::domain::value_objects::{Address, U256};
use crate::errors::ConfigError;
use crate::evm::gas::GasMultiplier;
use crate::evm::precompiles::PrecompileSet;
use crate::ports::outbound::{Tracer, ValidatorSet};
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Resolved execution environment.
#[derive(Clone)]
pub struct ExecutionConfig {
    /// Rule flags for the block.
    pub rules: ChainRules,
    /// `COINBASE`: operator address of the proposer.
    pub coinbase: Address,
    /// EIP-1559 base fee, if the fee market is active.
    pub base_fee: Option<U256>,
    /// Reachable precompiles.
    pub precompiles: Arc<PrecompileSet>,
    /// Optional message observer.
    pub tracer: Option<Arc<dyn Tracer>>,
    /// Call/create policy.
    pub access_control: AccessControl,
    /// Denomination of value and fees.
    pub evm_denom: String,
    /// Account receiving bought gas.
    pub fee_collector: Address,
    /// Minimum gas floor.
    pub min_gas_multiplier: GasMultiplier,
}

impl fmt::Debug for ExecutionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionConfig")
            .field("rules", &self.rules)
            .field("coinbase", &self.coinbase)
            .field("base_fee", &self.base_fee)
            .field("precompiles", &self.precompiles)
            .field("tracer", &self.tracer.is_some())
            .field("access_control", &self.access_control)
            .field("evm_denom", &self.evm_denom)
            .finish_non_exhaustive()
    }
}

/// The proposer to credit: `proposer` if given, else the block proposer.
#[must_use]
pub fn resolve_proposer<'a>(proposer: &'a [u8], block: &'a BlockContext) -> &'a [u8] {
    if proposer.is_empty() {
        &block.proposer
    } else {
        proposer
    }
}

impl ExecutionConfig {
    /// Builds the config for a message in `block`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::CoinbaseResolution`] when the proposer is not a known
    /// validator.
    pub fn build(
        params: &ExecutionParams,
        block: &BlockContext,
        proposer: &[u8],
        validators: &dyn ValidatorSet,
        precompiles: Arc<PrecompileSet>,
    ) -> Result<Self, ConfigError> {
        let proposer = resolve_proposer(proposer, block);
        let coinbase = validators.operator_address(proposer).ok_or_else(|| {
            error!(proposer = %hex::encode(proposer), "Coinbase resolution failed");
            ConfigError::CoinbaseResolution(proposer.to_vec())
        })?;

        Ok(Self {
            rules: params.forks.rules(block.chain_id, block.height),
            coinbase,
            base_fee: block.base_fee,
            precompiles,
            tracer: None,
            access_control: params.access_control.clone(),
            evm_denom: params.evm_denom.clone(),
            fee_collector: params.fee_collector,
            min_gas_multiplier: params.min_gas_multiplier,
        })
    }

    /// Returns a copy that reports to `tracer`.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }
}
