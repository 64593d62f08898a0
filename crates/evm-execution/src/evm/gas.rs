//! # Gas Accounting
//!
//! Pure gas functions used around execution: intrinsic gas, refund capping
//! (EIP-3529) and the fee-market minimum gas floor.
//!
//! Every accumulation step is overflow checked. A message whose intrinsic
//! gas does not fit in 64 bits is rejected, never wrapped.

use crate::domain::entities::AccessTuple;
use crate::domain::rules::ChainRules;
use crate::errors::{IntrinsicGasError, TransitionError};
use serde::{Deserialize, Serialize};

// =============================================================================
// COSTS
// =============================================================================

/// Gas costs charged before and around execution.
pub mod costs {
    /// Base transaction gas.
    pub const TX_BASE: u64 = 21_000;
    /// Contract creation base gas (Homestead onwards).
    pub const TX_CREATE: u64 = 53_000;
    /// Gas per zero byte of payload.
    pub const TX_DATA_ZERO: u64 = 4;
    /// Gas per non-zero byte of payload before Istanbul.
    pub const TX_DATA_NON_ZERO_FRONTIER: u64 = 68;
    /// Gas per non-zero byte of payload from Istanbul (EIP-2028).
    pub const TX_DATA_NON_ZERO: u64 = 16;
    /// Gas per 32-byte word of init code (EIP-3860).
    pub const INIT_CODE_WORD: u64 = 2;
    /// Gas per access-list address (EIP-2930).
    pub const ACCESS_LIST_ADDRESS: u64 = 2_400;
    /// Gas per access-list storage key (EIP-2930).
    pub const ACCESS_LIST_STORAGE_KEY: u64 = 1_900;
    /// Gas per byte of deployed code.
    pub const CODE_DEPOSIT_BYTE: u64 = 200;
}

/// Maximum deployed code size (EIP-170).
pub const MAX_CODE_SIZE: usize = 24_576;

/// Maximum init code size from Shanghai (EIP-3860).
pub const MAX_INIT_CODE_SIZE: usize = 2 * MAX_CODE_SIZE;

// =============================================================================
// INTRINSIC GAS
// =============================================================================

/// Gas charged before any execution.
///
/// # Errors
///
/// Returns [`IntrinsicGasError::Overflow`] naming the component whose
/// addition would not fit in a `u64`.
pub fn intrinsic_gas(
    payload: &[u8],
    access_list: &[AccessTuple],
    is_creation: bool,
    rules: &ChainRules,
) -> Result<u64, IntrinsicGasError> {
    let mut gas = if is_creation && rules.is_homestead {
        costs::TX_CREATE
    } else {
        costs::TX_BASE
    };

    if !payload.is_empty() {
        let non_zero = payload.iter().filter(|&&b| b != 0).count() as u64;
        let zero = payload.len() as u64 - non_zero;
        let non_zero_cost = if rules.is_istanbul {
            costs::TX_DATA_NON_ZERO
        } else {
            costs::TX_DATA_NON_ZERO_FRONTIER
        };

        gas = accumulate(gas, non_zero, non_zero_cost, "non-zero payload bytes")?;
        gas = accumulate(gas, zero, costs::TX_DATA_ZERO, "zero payload bytes")?;

        if is_creation && rules.is_shanghai {
            let words = (payload.len() as u64).div_ceil(32);
            gas = accumulate(gas, words, costs::INIT_CODE_WORD, "init code words")?;
        }
    }

    if !access_list.is_empty() {
        let keys = access_list
            .iter()
            .map(|tuple| tuple.storage_keys.len() as u64)
            .try_fold(0u64, u64::checked_add)
            .ok_or(IntrinsicGasError::Overflow("access list storage keys"))?;
        gas = accumulate(
            gas,
            access_list.len() as u64,
            costs::ACCESS_LIST_ADDRESS,
            "access list addresses",
        )?;
        gas = accumulate(gas, keys, costs::ACCESS_LIST_STORAGE_KEY, "access list storage keys")?;
    }

    Ok(gas)
}

/// `gas + count * unit`, checked at both steps.
fn accumulate(
    gas: u64,
    count: u64,
    unit: u64,
    component: &'static str,
) -> Result<u64, IntrinsicGasError> {
    count
        .checked_mul(unit)
        .and_then(|cost| gas.checked_add(cost))
        .ok_or(IntrinsicGasError::Overflow(component))
}

// =============================================================================
// REFUNDS
// =============================================================================

/// Refund actually granted: `min(raw_refund, gas_used / quotient)`.
///
/// # Panics
///
/// Panics when `quotient` is zero. The quotient comes from the chain rules,
/// so zero is a programming error rather than an input error.
#[must_use]
pub fn compute_refund(raw_refund: u64, gas_used: u64, quotient: u64) -> u64 {
    assert!(quotient != 0, "refund quotient cannot be zero");
    raw_refund.min(gas_used / quotient)
}

// =============================================================================
// MINIMUM GAS FLOOR
// =============================================================================

/// Ratio applied to the gas limit to obtain the minimum gas charged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasMultiplier {
    /// Numerator.
    pub numerator: u64,
    /// Denominator. Must be non-zero.
    pub denominator: u64,
}

impl GasMultiplier {
    /// A multiplier of zero: no floor.
    pub const DISABLED: Self = Self {
        numerator: 0,
        denominator: 1,
    };

    /// Creates a multiplier.
    #[must_use]
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// True when the floor is always zero.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.numerator == 0
    }
}

impl Default for GasMultiplier {
    /// Half the gas limit, the fee market default.
    fn default() -> Self {
        Self::new(1, 2)
    }
}

/// Minimum gas charged for a message: `ceil(gas_limit * multiplier)`.
///
/// A zero denominator disables the floor.
///
/// # Errors
///
/// Returns [`TransitionError::MinimumGasOverflow`] when the floor does not
/// fit in a `u64`.
pub fn minimum_gas_used(gas_limit: u64, multiplier: GasMultiplier) -> Result<u64, TransitionError> {
    if multiplier.is_disabled() || multiplier.denominator == 0 {
        return Ok(0);
    }
    let scaled = u128::from(gas_limit) * u128::from(multiplier.numerator);
    let floor = scaled.div_ceil(u128::from(multiplier.denominator));
    u64::try_from(floor).map_err(|_| TransitionError::MinimumGasOverflow { gas_limit })
}

/// Gas charged for depositing `len` bytes of contract code.
#[must_use]
pub fn code_deposit_cost(len: usize) -> u64 {
    (len as u64).saturating_mul(costs::CODE_DEPOSIT_BYTE)
}

// =============================================================================
// TESTS
// =============================================================================
