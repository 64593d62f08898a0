//! # Ports Layer
//!
//! Trait definitions between the execution core and the host node.
//!
//! - **Driving (inbound)**: `MessageExecutor`
//! - **Driven (outbound)**: `Ledger`, `GrantStore`, `LogSink`, `StateDb`,
//!   `HeaderStore`, `ValidatorSet`, `Interpreter`, `Host`, `Tracer`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
