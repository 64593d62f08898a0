//! # Token Pair Registry
//!
//! Bijective mapping between host denominations and EVM contract addresses.
//! A denomination maps to exactly one address and an address to exactly one
//! denomination; registration refuses anything that would break that.

use crate::domain::entities::TokenPair;
use crate::domain::value_objects::{is_valid_denom, Address};
use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Registry of token pairs.
///
/// Serializes as the list of pairs ordered by denomination; deserializing
/// re-runs every registration check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TokenPair>", into = "Vec<TokenPair>")]
pub struct TokenPairRegistry {
    by_denom: BTreeMap<String, TokenPair>,
    by_address: BTreeMap<Address, String>,
}

impl TokenPairRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pair.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidDenom`] for a malformed denomination
    /// - [`RegistryError::ZeroAddress`] for the zero address
    /// - [`RegistryError::DuplicateDenom`] / [`RegistryError::DuplicateAddress`]
    ///   when either side is already bound
    pub fn register(&mut self, pair: TokenPair) -> Result<(), RegistryError> {
        if !is_valid_denom(&pair.denom) {
            return Err(RegistryError::InvalidDenom(pair.denom));
        }
        if pair.address.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        if self.by_denom.contains_key(&pair.denom) {
            return Err(RegistryError::DuplicateDenom(pair.denom));
        }
        if self.by_address.contains_key(&pair.address) {
            return Err(RegistryError::DuplicateAddress(pair.address));
        }

        info!(
            denom = %pair.denom,
            address = ?pair.address,
            owner = pair.owner.label(),
            "Token pair registered"
        );
        self.by_address.insert(pair.address, pair.denom.clone());
        self.by_denom.insert(pair.denom.clone(), pair);
        Ok(())
    }

    /// Pair bound to `denom`.
    #[must_use]
    pub fn lookup(&self, denom: &str) -> Option<&TokenPair> {
        self.by_denom.get(denom)
    }

    /// Pair bound to `address`.
    #[must_use]
    pub fn lookup_by_address(&self, address: &Address) -> Option<&TokenPair> {
        self.by_address
            .get(address)
            .and_then(|denom| self.by_denom.get(denom))
    }

    /// Pair identified by either its `0x` address or its denomination.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if nothing matches.
    pub fn get(&self, key: &str) -> Result<&TokenPair, RegistryError> {
        let found = match Address::from_hex(key) {
            Ok(address) if key.starts_with("0x") => self.lookup_by_address(&address),
            _ => self.lookup(key),
        };
        found.ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Flips the `enabled` flag of the pair identified by `key`.
    ///
    /// Callers holding a precompile table built from this registry must
    /// rebuild it.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if nothing matches.
    pub fn toggle(&mut self, key: &str) -> Result<&TokenPair, RegistryError> {
        let denom = self.get(key)?.denom.clone();
        let pair = self
            .by_denom
            .get_mut(&denom)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;
        pair.enabled = !pair.enabled;
        debug!(denom = %pair.denom, enabled = pair.enabled, "Token pair toggled");
        Ok(pair)
    }

    /// Pairs ordered by denomination.
    pub fn iter(&self) -> impl Iterator<Item = &TokenPair> {
        self.by_denom.values()
    }

    /// Number of registered pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_denom.len()
    }

    /// True when no pair is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_denom.is_empty()
    }
}

impl TryFrom<Vec<TokenPair>> for TokenPairRegistry {
    type Error = RegistryError;

    fn try_from(pairs: Vec<TokenPair>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for pair in pairs {
            registry.register(pair)?;
        }
        Ok(registry)
    }
}

impl From<TokenPairRegistry> for Vec<TokenPair> {
    fn from(registry: TokenPairRegistry) -> Self {
        registry.by_denom.into_values().collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
