//! # Error Types
//!
//! All error types for the execution core.
//!
//! Accounting invariant violations (refund quotient of zero, a host meter that
//! would have to go backwards) are not represented here: they panic, because
//! continuing would let two nodes diverge on consensus-critical state.

use crate::domain::value_objects::{Address, U256};
use thiserror::Error;

// =============================================================================
// TRANSITION ERRORS
// =============================================================================

/// Errors that abort a state transition without producing a receipt.
///
/// Execution reverts are NOT errors: they produce a receipt with
/// `reverted = true`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The message failed pre-execution validation.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] ValidationError),

    /// Intrinsic gas computation overflowed.
    #[error(transparent)]
    IntrinsicGas(#[from] IntrinsicGasError),

    /// The message cannot pay for its own intrinsic gas.
    #[error("intrinsic gas too low: have {limit}, want {intrinsic}")]
    IntrinsicGasExceedsLimit {
        /// Intrinsic gas of the message.
        intrinsic: u64,
        /// Message gas limit.
        limit: u64,
    },

    /// Gas purchase or leftover refund against the fee collector failed.
    #[error("fee settlement failed: {0}")]
    FeeSettlement(#[source] LedgerError),

    /// Leftover gas larger than the message gas limit.
    #[error("leftover gas {leftover} exceeds gas limit {limit}")]
    RefundExceedsGasLimit {
        /// Gas that would be returned.
        leftover: u64,
        /// Message gas limit.
        limit: u64,
    },

    /// The fee-market gas floor does not fit in 64 bits.
    #[error("minimum gas used overflows u64 for gas limit {gas_limit}")]
    MinimumGasOverflow {
        /// Message gas limit.
        gas_limit: u64,
    },

    /// The execution configuration could not be built.
    #[error("execution config: {0}")]
    Config(#[from] ConfigError),

    /// The precompile table could not be built from the registry.
    #[error("precompile table: {0}")]
    Registry(#[from] RegistryError),

    /// The interpreter reported more gas than it was given.
    #[error("interpreter used {used} gas out of {available}")]
    InterpreterGasOverflow {
        /// Gas the interpreter reported.
        used: u64,
        /// Gas it was handed.
        available: u64,
    },

    /// The ledger write layer rejected a scope operation.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
}

impl TransitionError {
    /// Short label for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidTransaction(_) => "invalid_transaction",
            Self::IntrinsicGas(_) | Self::IntrinsicGasExceedsLimit { .. } => "intrinsic_gas",
            Self::FeeSettlement(_) | Self::RefundExceedsGasLimit { .. } => "fee_settlement",
            Self::MinimumGasOverflow { .. } | Self::InterpreterGasOverflow { .. } => "gas_accounting",
            Self::Config(_) => "config",
            Self::Registry(_) => "registry",
            Self::Ledger(_) => "ledger",
        }
    }
}

/// Reasons a message is rejected before any gas is consumed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Message nonce differs from the account nonce.
    #[error("nonce mismatch: account nonce {expected}, message nonce {got}")]
    NonceMismatch {
        /// Account nonce.
        expected: u64,
        /// Message nonce.
        got: u64,
    },

    /// Sender cannot cover value plus the full gas budget.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// `gas_limit * price + value`.
        required: U256,
        /// Sender balance in the EVM denomination.
        available: U256,
    },

    /// Access lists require the Berlin rules.
    #[error("access list transactions are not enabled")]
    AccessListNotSupported,

    /// Fee-cap/tip pricing requires the London rules.
    #[error("dynamic fee transactions are not enabled")]
    DynamicFeeNotSupported,

    /// Tip cap higher than the fee cap.
    #[error("max priority fee {tip} higher than max fee {fee_cap}")]
    TipAboveFeeCap {
        /// Priority tip cap.
        tip: U256,
        /// Fee cap.
        fee_cap: U256,
    },

    /// Fee cap below the block base fee. A legacy gas price is its own cap.
    #[error("max fee {fee_cap} less than block base fee {base_fee}")]
    FeeCapBelowBaseFee {
        /// Highest price the message pays.
        fee_cap: U256,
        /// Block base fee.
        base_fee: U256,
    },

    /// Gas limit above what the host meter for this message allows.
    #[error("gas limit {gas_limit} exceeds host meter limit {meter_limit}")]
    GasLimitExceedsMeter {
        /// Message gas limit.
        gas_limit: u64,
        /// Host meter limit.
        meter_limit: u64,
    },

    /// Decoded gas price was negative.
    #[error("gas price cannot be negative: {0}")]
    NegativeGasPrice(i128),

    /// `gas_limit * price + value` does not fit in 256 bits.
    #[error("transaction cost overflows")]
    CostOverflow,

    /// Creation payload above the EIP-3860 limit.
    #[error("init code size {size} exceeds limit {max}")]
    InitCodeTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Limit in bytes.
        max: usize,
    },
}

/// Intrinsic gas accumulation overflowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntrinsicGasError {
    /// Overflow while adding the named component.
    #[error("intrinsic gas overflow while adding {0}")]
    Overflow(&'static str),
}

// =============================================================================
// PRECOMPILE ERRORS
// =============================================================================

/// Errors from precompiled contract execution. All of them revert the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Caller balance too low for the requested amount.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Requested amount.
        required: U256,
        /// Caller balance.
        available: U256,
    },

    /// Missing, expired or insufficient authorization grant.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Input could not be decoded.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Selector is not part of the interface.
    #[error("unknown method: 0x{}", hex::encode(.0))]
    UnknownMethod([u8; 4]),

    /// Out of gas during precompile execution.
    #[error("precompile out of gas")]
    OutOfGas,

    /// Value was attached to a non-payable method.
    #[error("method is not payable")]
    NonPayable,

    /// State-changing method called in a static context.
    #[error("write protection")]
    WriteProtection,

    /// Arithmetic on an allowance overflowed or underflowed.
    #[error("allowance arithmetic overflow")]
    AllowanceOverflow,

    /// The underlying ledger refused the operation.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
}

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors from the ledger capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Balance too low for a transfer.
    #[error("insufficient funds in {address:?}: {available}{denom} < {required}{denom}")]
    InsufficientFunds {
        /// Debited account.
        address: Address,
        /// Debited denomination.
        denom: String,
        /// Requested amount.
        required: U256,
        /// Current balance.
        available: U256,
    },

    /// Account is required to exist but does not.
    #[error("account {0:?} does not exist")]
    UnknownAccount(Address),

    /// Balance or supply overflow.
    #[error("balance overflow")]
    Overflow,

    /// Commit or rollback without an open scope.
    #[error("no open write scope")]
    NoOpenScope,

    /// Scopes closed out of order.
    #[error("scope mismatch: innermost is {innermost}, got {got}")]
    ScopeMismatch {
        /// Innermost open scope.
        innermost: usize,
        /// Scope the caller tried to close.
        got: usize,
    },
}

// =============================================================================
// REGISTRY & GENESIS ERRORS
// =============================================================================

/// Errors from the token pair registry and the precompile table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Denomination already registered.
    #[error("token pair for denom {0} already registered")]
    DuplicateDenom(String),

    /// Address already registered.
    #[error("token pair for address {0:?} already registered")]
    DuplicateAddress(Address),

    /// Denomination failed validation.
    #[error("invalid denom: {0}")]
    InvalidDenom(String),

    /// Zero address cannot back a token pair.
    #[error("token pair address cannot be zero")]
    ZeroAddress,

    /// No token pair for the given key.
    #[error("token pair not found: {0}")]
    NotFound(String),

    /// Precompile listed in params but not registered.
    #[error("precompile {0:?} has no registered token pair")]
    UnregisteredPrecompile(Address),

    /// Precompile listed twice across the native and dynamic lists.
    #[error("precompile {0:?} listed more than once")]
    DuplicatePrecompile(Address),

    /// Precompile listed under the wrong class.
    #[error("precompile {address:?} listed as {listed} but registered as {registered}")]
    OwnerMismatch {
        /// Precompile address.
        address: Address,
        /// Class it is listed under.
        listed: &'static str,
        /// Class of the registered pair.
        registered: &'static str,
    },
}

/// Errors while loading genesis.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenesisError {
    /// Registry invariant violated.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Genesis document could not be parsed.
    #[error("genesis parse error: {0}")]
    Parse(String),

    /// Genesis file could not be read.
    #[error("failed to read genesis {path}: {error}")]
    Io {
        /// Genesis path.
        path: String,
        /// Underlying I/O error.
        error: String,
    },

    /// Execution parameters rejected while initializing from genesis.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors from configuration loading, validation and config construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Config path.
        path: String,
        /// Underlying I/O error.
        error: String,
    },

    /// Parse error.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Semantically invalid value.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Block proposer has no known operator address.
    #[error("failed to resolve coinbase for proposer 0x{}", hex::encode(.0))]
    CoinbaseResolution(Vec<u8>),
}

// =============================================================================
// PARSE ERRORS
// =============================================================================

/// Errors parsing hex-encoded primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Not valid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Wrong byte length.
    #[error("expected {expected} bytes, got {actual}")]
    Length {
        /// Required length.
        expected: usize,
        /// Decoded length.
        actual: usize,
    },
}

// =============================================================================
// TESTS
// =============================================================================
