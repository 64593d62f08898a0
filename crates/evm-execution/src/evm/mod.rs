//! # EVM Adapter Layer
//!
//! Everything between the state transition and the interpreter.
//!
//! ## Components
//!
//! - `gas.rs` - Intrinsic gas, refund cap, minimum gas floor
//! - `meter.rs` - Host resource meter and its reconciliation
//! - `hash_resolver.rs` - `BLOCKHASH` from historical headers
//! - `execution_config.rs` - Per-message environment (rules, coinbase, precompiles)
//! - `host.rs` - [`Host`](crate::ports::outbound::Host) implementation
//! - `interpreter.rs` - Native interpreter (transfers, precompiles, code deposit)
//! - `precompiles/` - ERC20 bridge precompiles

pub mod execution_config;
pub mod gas;
pub mod hash_resolver;
pub mod host;
pub mod interpreter;
pub mod meter;
pub mod precompiles;

pub use execution_config::{resolve_proposer, ExecutionConfig};
pub use gas::{compute_refund, intrinsic_gas, minimum_gas_used, GasMultiplier};
pub use hash_resolver::HashResolver;
pub use host::ExecutionHost;
pub use interpreter::NativeInterpreter;
pub use meter::{reconcile_resource_meter, ResourceMeter};
pub use precompiles::{Precompile, PrecompileCall, PrecompileOutput, PrecompileSet};
