//! # Adapters Layer
//!
//! In-memory implementations of the driven ports, used by the test suite and
//! by hosts that simulate messages without a persistent store.

pub mod headers;
pub mod ledger;
pub mod tracer;
pub mod validators;

pub use headers::*;
pub use ledger::*;
pub use tracer::*;
pub use validators::*;
