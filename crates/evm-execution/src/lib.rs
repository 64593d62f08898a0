//! # EVM Execution - Ledger Message Execution Core
//!
//! Applies EVM messages to a host ledger: validation, gas purchase,
//! execution through a pluggable interpreter, refunds and fee settlement.
//! The ERC20 bridge exposes registered host coins as precompiled ERC-20
//! contracts.
//!
//! ## Message Lifecycle
//!
//! | Phase | What happens | Location |
//! |-------|--------------|----------|
//! | Validated | fee rules, nonce, balance | `state_transition.rs` |
//! | GasComputed | intrinsic gas, gas purchase | `evm/gas.rs`, `state_transition.rs` |
//! | Executed / Reverted | access control, interpreter in a nested scope | `evm/interpreter.rs` |
//! | Refunded | refund cap, minimum gas floor, meter reconciliation | `evm/gas.rs`, `evm/meter.rs` |
//! | Settled | leftover gas returned from the fee collector | `state_transition.rs` |
//!
//! ## Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Refund never exceeds `gas_used / quotient` | `evm/gas.rs` - `compute_refund()` |
//! | Host meter reconciled once, never backwards | `evm/meter.rs` - `reconcile_resource_meter()` |
//! | Denom/address bijection | `registry.rs` - `register()` |
//! | Reverted writes discarded, gas still charged | `state_transition.rs` - `run_interpreter()` |
//! | Unverifiable historical hash reads as zero | `evm/hash_resolver.rs` - `resolve()` |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `Ledger` + `GrantStore` + `LogSink` | Scoped balances, grants and logs |
//! | `HeaderStore` | Historical headers for `BLOCKHASH` |
//! | `ValidatorSet` | Proposer to operator address (`COINBASE`) |
//! | `Interpreter` | Bytecode execution |
//! | `Tracer` | Optional message observer |
//!
//! ## Usage Example
//!
//! ```ignore
//! use evm_execution::prelude::*;
//!
//! let mut engine = StateTransition::new(
//!     ledger, headers, NativeInterpreter, validators,
//!     ExecutionParams::default(), TokenPairRegistry::new(),
//! )?;
//! let receipt = engine.apply_message(&msg, &block, &mut meter, true)?;
//! println!("gas used: {}", receipt.gas_used);
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod evm;
pub mod genesis;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod state_transition;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{
        AccessTuple, AuthorizationGrant, BlockContext, BlockHeader, FeeTerms, GasState,
        HistoricalHeader, Log, Message, OwnerKind, Receipt, TokenPair, TransitionPhase,
    };
    pub use crate::domain::rules::{ChainRules, ForkSchedule};
    pub use crate::domain::services::{compute_contract_address, keccak256, module_address};
    pub use crate::domain::value_objects::{Address, Bytes, Hash, U256};

    // Ports
    pub use crate::ports::inbound::MessageExecutor;
    pub use crate::ports::outbound::{
        GrantStore, HeaderStore, Host, Interpreter, InterpreterResult, Ledger, LogSink, StateDb,
        Tracer, ValidatorSet,
    };

    // EVM components
    pub use crate::evm::{
        gas, ExecutionConfig, GasMultiplier, NativeInterpreter, PrecompileSet, ResourceMeter,
    };

    // Adapters
    pub use crate::adapters::{
        InMemoryHeaderStore, InMemoryLedger, LoggingTracer, StaticValidatorSet,
    };

    // Configuration and genesis
    pub use crate::config::{AccessControl, AccessType, Erc20Params, ExecutionParams};
    pub use crate::genesis::GenesisState;
    pub use crate::registry::TokenPairRegistry;

    // Errors
    pub use crate::errors::{
        ConfigError, GenesisError, LedgerError, PrecompileError, RegistryError, TransitionError,
        ValidationError,
    };

    // Service
    pub use crate::state_transition::StateTransition;
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
