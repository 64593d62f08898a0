//! # Execution Parameters
//!
//! Governance-controlled parameters of the execution core, loadable from TOML
//! or JSON. Every section has defaults; `validate()` rejects combinations the
//! engine cannot run with.
//!
//! ```toml
//! evm_denom = "aledger"
//! fee_collector = "0x..."
//! approval_expiration_secs = 31536000
//!
//! [forks]
//! london = 0
//!
//! [min_gas_multiplier]
//! numerator = 1
//! denominator = 2
//!
//! [access_control.create]
//! permissioned = ["0x..."]
//!
//! [erc20]
//! enable_erc20 = true
//! native_precompiles = ["0x..."]
//! ```

use crate::domain::rules::ForkSchedule;
use crate::domain::services::module_address;
use crate::domain::value_objects::{is_valid_denom, Address};
use crate::errors::ConfigError;
use crate::evm::gas::GasMultiplier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Default lifetime of grants created through `approve` (one year).
pub const DEFAULT_APPROVAL_EXPIRATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Module account name of the fee collector.
pub const FEE_COLLECTOR_NAME: &str = "fee_collector";

// =============================================================================
// ACCESS CONTROL
// =============================================================================

/// Who may perform an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Anyone.
    #[default]
    Permissionless,
    /// No one.
    Restricted,
    /// Only the listed senders.
    Permissioned(Vec<Address>),
}

impl AccessType {
    /// True when `sender` may perform the operation.
    #[must_use]
    pub fn allows(&self, sender: &Address) -> bool {
        match self {
            Self::Permissionless => true,
            Self::Restricted => false,
            Self::Permissioned(allowed) => allowed.contains(sender),
        }
    }
}

/// Access policy for calls and contract creations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccessControl {
    /// Policy for messages with a recipient.
    pub call: AccessType,
    /// Policy for contract creations.
    pub create: AccessType,
}

impl AccessControl {
    /// Policy applying to a message kind.
    #[must_use]
    pub const fn for_message(&self, is_creation: bool) -> &AccessType {
        if is_creation {
            &self.create
        } else {
            &self.call
        }
    }
}

// =============================================================================
// ERC20 PARAMS
// =============================================================================

/// ERC20 bridge parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Erc20Params {
    /// Master switch. Disabled means no bridge precompile is reachable.
    pub enable_erc20: bool,
    /// Precompiles of module-owned pairs.
    pub native_precompiles: Vec<Address>,
    /// Precompiles of externally owned pairs.
    pub dynamic_precompiles: Vec<Address>,
}

impl Default for Erc20Params {
    fn default() -> Self {
        Self {
            enable_erc20: true,
            native_precompiles: Vec::new(),
            dynamic_precompiles: Vec::new(),
        }
    }
}

impl Erc20Params {
    /// First address listed more than once across both lists.
    #[must_use]
    pub fn first_duplicate(&self) -> Option<Address> {
        let mut seen = BTreeSet::new();
        self.native_precompiles
            .iter()
            .chain(&self.dynamic_precompiles)
            .find(|addr| !seen.insert(**addr))
            .copied()
    }
}

// =============================================================================
// EXECUTION PARAMS
// =============================================================================

/// Parameters of the execution core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionParams {
    /// Denomination of EVM value and fees.
    pub evm_denom: String,
    /// Fork activation heights.
    pub forks: ForkSchedule,
    /// Account receiving bought gas.
    pub fee_collector: Address,
    /// Fraction of the gas limit always charged.
    pub min_gas_multiplier: GasMultiplier,
    /// Call/create policy.
    pub access_control: AccessControl,
    /// Lifetime of grants created by `approve`.
    pub approval_expiration_secs: u64,
    /// ERC20 bridge parameters.
    pub erc20: Erc20Params,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            evm_denom: "aledger".to_string(),
            forks: ForkSchedule::default(),
            fee_collector: module_address(FEE_COLLECTOR_NAME),
            min_gas_multiplier: GasMultiplier::default(),
            access_control: AccessControl::default(),
            approval_expiration_secs: DEFAULT_APPROVAL_EXPIRATION_SECS,
            erc20: Erc20Params::default(),
        }
    }
}

impl ExecutionParams {
    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_denom(&self.evm_denom) {
            return Err(ConfigError::Invalid(format!(
                "evm_denom {:?} is not a valid denomination",
                self.evm_denom
            )));
        }

        if let Some((earlier, later)) = self.forks.first_disorder() {
            return Err(ConfigError::Invalid(format!(
                "fork {later} activates before {earlier}"
            )));
        }

        if self.fee_collector.is_zero() {
            return Err(ConfigError::Invalid("fee_collector cannot be zero".into()));
        }

        let multiplier = self.min_gas_multiplier;
        if multiplier.denominator == 0 {
            return Err(ConfigError::Invalid(
                "min_gas_multiplier denominator cannot be 0".into(),
            ));
        }
        if multiplier.numerator > multiplier.denominator {
            return Err(ConfigError::Invalid(
                "min_gas_multiplier must be between 0 and 1".into(),
            ));
        }

        if self.approval_expiration_secs == 0 {
            return Err(ConfigError::Invalid(
                "approval_expiration_secs cannot be 0".into(),
            ));
        }

        if let Some(addr) = self.erc20.first_duplicate() {
            return Err(ConfigError::Invalid(format!(
                "precompile {addr:?} listed more than once"
            )));
        }

        Ok(())
    }

    /// Loads and validates parameters from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    /// Parses and validates parameters from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if the content cannot be parsed or validated.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Parses and validates parameters from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns error if the content cannot be parsed or validated.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let params: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

// =============================================================================
// TESTS
// =============================================================================
