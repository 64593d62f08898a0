//! # Precompiled Contracts
//!
//! Fixed, address-keyed table of ERC20 bridge precompiles.
//!
//! The table is built once per block from the token pair registry and the
//! ERC20 parameters, kept sorted by address and searched with a binary
//! search. Registry changes require a rebuild.

pub mod abi;
pub mod erc20;

use crate::config::Erc20Params;
use crate::domain::entities::OwnerKind;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::{PrecompileError, RegistryError};
use crate::ports::outbound::StateDb;
use crate::registry::TokenPairRegistry;
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub use erc20::Erc20Precompile;

/// Precompile execution result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Gas used by the precompile.
    pub gas_used: u64,
    /// Output data.
    pub output: Bytes,
}

/// Inputs of one precompile invocation.
#[derive(Clone, Debug)]
pub struct PrecompileCall<'a> {
    /// Calldata.
    pub input: &'a [u8],
    /// Immediate caller.
    pub caller: Address,
    /// Value attached to the call.
    pub value: U256,
    /// Gas available.
    pub gas_limit: u64,
    /// True inside `STATICCALL`.
    pub is_static: bool,
    /// Block time, for grant expiry.
    pub block_time: u64,
}

/// Trait for precompiled contracts.
pub trait Precompile: Send + Sync {
    /// Get the address of this precompile.
    fn address(&self) -> Address;

    /// Executes the call against `state`.
    ///
    /// Writes are made directly; the dispatcher wraps the call in its own
    /// scope and rolls it back when this returns an error.
    fn run(
        &self,
        call: &PrecompileCall<'_>,
        state: &mut dyn StateDb,
    ) -> Result<PrecompileOutput, PrecompileError>;
}

struct Entry {
    address: Address,
    class: OwnerKind,
    precompile: Box<dyn Precompile>,
}

/// Precompiles reachable in the current block.
#[derive(Default)]
pub struct PrecompileSet {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for PrecompileSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.address, e.class)))
            .finish()
    }
}

impl PrecompileSet {
    /// An empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the table for a block.
    ///
    /// Every listed address must be registered with the matching owner
    /// class. Disabled pairs are listed but not exposed. With ERC20 disabled
    /// the table is empty.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicatePrecompile`] for an address listed twice
    /// - [`RegistryError::UnregisteredPrecompile`] for an unknown address
    /// - [`RegistryError::OwnerMismatch`] for a class mismatch
    pub fn build(
        registry: &TokenPairRegistry,
        params: &Erc20Params,
        approval_expiration_secs: u64,
    ) -> Result<Self, RegistryError> {
        if !params.enable_erc20 {
            debug!("ERC20 disabled, no bridge precompiles");
            return Ok(Self::empty());
        }

        let listed = params
            .native_precompiles
            .iter()
            .map(|addr| (addr, OwnerKind::Module))
            .chain(
                params
                    .dynamic_precompiles
                    .iter()
                    .map(|addr| (addr, OwnerKind::External)),
            );

        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for (address, class) in listed {
            if !seen.insert(*address) {
                return Err(RegistryError::DuplicatePrecompile(*address));
            }
            let pair = registry
                .lookup_by_address(address)
                .ok_or(RegistryError::UnregisteredPrecompile(*address))?;
            if pair.owner != class {
                return Err(RegistryError::OwnerMismatch {
                    address: *address,
                    listed: class.label(),
                    registered: pair.owner.label(),
                });
            }
            if !pair.enabled {
                warn!(denom = %pair.denom, address = ?address, "Token pair disabled, precompile skipped");
                continue;
            }
            entries.push(Entry {
                address: *address,
                class,
                precompile: Box::new(Erc20Precompile::new(
                    *address,
                    pair.denom.clone(),
                    approval_expiration_secs,
                )),
            });
        }

        entries.sort_by_key(|entry| entry.address);
        debug!(count = entries.len(), "Precompile table built");
        Ok(Self { entries })
    }

    fn position(&self, address: &Address) -> Option<usize> {
        self.entries
            .binary_search_by_key(address, |entry| entry.address)
            .ok()
    }

    /// Precompile at `address`.
    #[must_use]
    pub fn lookup(&self, address: &Address) -> Option<&dyn Precompile> {
        self.position(address)
            .map(|i| self.entries[i].precompile.as_ref())
    }

    /// True when `address` is a reachable precompile.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.position(address).is_some()
    }

    /// Addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.iter().map(|entry| entry.address)
    }

    /// Number of native (module-owned) precompiles.
    #[must_use]
    pub fn native_count(&self) -> usize {
        self.count(OwnerKind::Module)
    }

    /// Number of dynamic (externally owned) precompiles.
    #[must_use]
    pub fn dynamic_count(&self) -> usize {
        self.count(OwnerKind::External)
    }

    fn count(&self, class: OwnerKind) -> usize {
        self.entries.iter().filter(|e| e.class == class).count()
    }

    /// Number of reachable precompiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is reachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the precompile at `address`, if there is one.
    ///
    /// The call runs in its own write scope: committed into the caller's
    /// scope on success, rolled back on error.
    pub fn dispatch(
        &self,
        address: &Address,
        call: &PrecompileCall<'_>,
        state: &mut dyn StateDb,
    ) -> Option<Result<PrecompileOutput, PrecompileError>> {
        let precompile = self.lookup(address)?;

        let scope = state.begin_scope();
        let result = precompile.run(call, state);
        let closed = match &result {
            Ok(_) => state.commit_scope(scope),
            Err(err) => {
                debug!(precompile = ?address, %err, "Precompile call reverted");
                state.rollback_scope(scope)
            }
        };

        Some(closed.map_err(PrecompileError::from).and(result))
    }
}

// =============================================================================
// TESTS
// =============================================================================
