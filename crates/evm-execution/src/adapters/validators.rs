//! # Static Validator Set
//!
//! Fixed proposer-to-operator mapping for tests and single-node setups.

use crate::domain::value_objects::Address;
use crate::ports::outbound::ValidatorSet;
use std::collections::BTreeMap;

/// Validator set backed by a map from consensus address to operator.
#[derive(Clone, Debug, Default)]
pub struct StaticValidatorSet {
    operators: BTreeMap<Vec<u8>, Address>,
}

impl StaticValidatorSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one more validator.
    #[must_use]
    pub fn with_validator(mut self, consensus_address: impl Into<Vec<u8>>, operator: Address) -> Self {
        self.insert(consensus_address, operator);
        self
    }

    /// Adds or replaces a validator.
    pub fn insert(&mut self, consensus_address: impl Into<Vec<u8>>, operator: Address) {
        self.operators.insert(consensus_address.into(), operator);
    }
}

impl ValidatorSet for StaticValidatorSet {
    fn operator_address(&self, consensus_address: &[u8]) -> Option<Address> {
        self.operators.get(consensus_address).copied()
    }
}
