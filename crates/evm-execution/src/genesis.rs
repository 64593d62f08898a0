//! # Genesis
//!
//! Initial token pairs and ERC20 parameters. Loading checks that the
//! registry is a bijection and that every listed precompile is registered
//! under the class it is listed as.

use crate::config::{Erc20Params, DEFAULT_APPROVAL_EXPIRATION_SECS};
use crate::domain::entities::TokenPair;
use crate::errors::{GenesisError, RegistryError};
use crate::evm::precompiles::PrecompileSet;
use crate::registry::TokenPairRegistry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Genesis state of the ERC20 bridge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    /// ERC20 parameters.
    pub params: Erc20Params,
    /// Registered token pairs.
    pub token_pairs: Vec<TokenPair>,
}

impl GenesisState {
    /// Loads genesis from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or fails
    /// validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GenesisError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| GenesisError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    /// Parses and validates genesis JSON.
    ///
    /// # Errors
    ///
    /// Returns error on malformed JSON or a failed validation.
    pub fn from_json_str(content: &str) -> Result<Self, GenesisError> {
        let genesis: Self =
            serde_json::from_str(content).map_err(|e| GenesisError::Parse(e.to_string()))?;
        genesis.validate()?;
        Ok(genesis)
    }

    /// Builds the registry and checks the precompile lists against it.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateDenom`] / [`RegistryError::DuplicateAddress`]
    /// - [`RegistryError::DuplicatePrecompile`]
    /// - [`RegistryError::UnregisteredPrecompile`]
    /// - [`RegistryError::OwnerMismatch`]
    pub fn validate(&self) -> Result<TokenPairRegistry, GenesisError> {
        let registry = TokenPairRegistry::try_from(self.token_pairs.clone())?;
        if let Some(address) = self.params.first_duplicate() {
            return Err(RegistryError::DuplicatePrecompile(address).into());
        }
        // Class checks run even when ERC20 is disabled: the lists are still
        // stored and take effect once it is switched on.
        let params = Erc20Params {
            enable_erc20: true,
            ..self.params.clone()
        };
        PrecompileSet::build(&registry, &params, DEFAULT_APPROVAL_EXPIRATION_SECS)?;
        Ok(registry)
    }

    /// Validates and splits into parameters and registry.
    ///
    /// # Errors
    ///
    /// See [`GenesisState::validate`].
    pub fn into_parts(self) -> Result<(Erc20Params, TokenPairRegistry), GenesisError> {
        let registry = self.validate()?;
        info!(
            pairs = registry.len(),
            native = self.params.native_precompiles.len(),
            dynamic = self.params.dynamic_precompiles.len(),
            enabled = self.params.enable_erc20,
            "Genesis loaded"
        );
        Ok((self.params, registry))
    }

    /// Exports the current registry and parameters.
    #[must_use]
    pub fn export(params: &Erc20Params, registry: &TokenPairRegistry) -> Self {
        Self {
            params: params.clone(),
            token_pairs: registry.iter().cloned().collect(),
        }
    }
}
