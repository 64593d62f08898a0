//! # Domain Layer
//!
//! Pure types and functions: no I/O, no ledger access.

pub mod entities;
pub mod rules;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use rules::*;
pub use services::*;
pub use value_objects::*;
