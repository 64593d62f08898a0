//! # Driven Ports (SPI - Outbound)
//!
//! Capabilities the execution core depends on. The host node provides real
//! implementations; `crate::adapters` has in-memory ones for tests.
//!
//! All state writes go through [`StateDb`], which is scoped: every write made
//! after [`Ledger::begin_scope`] is undone by the matching
//! [`Ledger::rollback_scope`]. Balances, nonces, code, grants and logs share
//! the same journal.

use crate::domain::entities::{
    AuthorizationGrant, BlockContext, HistoricalHeader, Log, Message, Receipt,
};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::{LedgerError, PrecompileError};
use crate::evm::execution_config::ExecutionConfig;
use crate::evm::precompiles::PrecompileOutput;

/// Handle of an open write scope (its nesting depth).
pub type ScopeId = usize;

// =============================================================================
// LEDGER
// =============================================================================

/// Multi-asset ledger with a scoped write layer.
pub trait Ledger {
    /// Balance of `address` in `denom` (zero for unknown accounts).
    fn balance(&self, address: &Address, denom: &str) -> U256;

    /// Moves `amount` of `denom` from `from` to `to`, creating `to` if needed.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientFunds`] if `from` cannot cover `amount`,
    /// [`LedgerError::Overflow`] if the recipient balance would overflow.
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        denom: &str,
        amount: U256,
    ) -> Result<(), LedgerError>;

    /// Total supply of `denom`.
    fn total_supply(&self, denom: &str) -> U256;

    /// Account nonce (zero for unknown accounts).
    fn nonce(&self, address: &Address) -> u64;

    /// Sets the account nonce, creating the account if needed.
    fn set_nonce(&mut self, address: &Address, nonce: u64);

    /// True once the account has been created.
    fn account_exists(&self, address: &Address) -> bool;

    /// Contract code (empty for plain accounts).
    fn code(&self, address: &Address) -> Bytes;

    /// Stores contract code, creating the account if needed.
    fn set_code(&mut self, address: &Address, code: Bytes);

    /// Opens a nested write scope.
    fn begin_scope(&mut self) -> ScopeId;

    /// Folds the innermost scope into its parent (or into durable state).
    ///
    /// # Errors
    ///
    /// [`LedgerError::NoOpenScope`] or [`LedgerError::ScopeMismatch`] when
    /// `scope` is not the innermost open scope.
    fn commit_scope(&mut self, scope: ScopeId) -> Result<(), LedgerError>;

    /// Undoes every write made since `scope` was opened and closes it.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::commit_scope`].
    fn rollback_scope(&mut self, scope: ScopeId) -> Result<(), LedgerError>;
}

/// Storage of authorization grants, keyed by `(granter, grantee)`.
pub trait GrantStore {
    /// Grant from `granter` to `grantee`, if any (expired grants included).
    fn grant(&self, granter: &Address, grantee: &Address) -> Option<AuthorizationGrant>;

    /// Creates or replaces a grant.
    fn set_grant(&mut self, grant: AuthorizationGrant);

    /// Deletes the grant from `granter` to `grantee`.
    fn revoke_grant(&mut self, granter: &Address, grantee: &Address);
}

/// Ordered log buffer.
pub trait LogSink {
    /// Appends a log.
    fn add_log(&mut self, log: Log);

    /// Drains all buffered logs in emission order.
    fn take_logs(&mut self) -> Vec<Log>;
}

/// The state handle the interpreter and precompiles write through.
pub trait StateDb: Ledger + GrantStore + LogSink {}

impl<T: Ledger + GrantStore + LogSink> StateDb for T {}

// =============================================================================
// HISTORICAL HEADERS
// =============================================================================

/// Read access to headers of past blocks.
pub trait HeaderStore {
    /// Header stored for `height`, if retained.
    fn historical_header(&self, height: u64) -> Option<HistoricalHeader>;
}

// =============================================================================
// VALIDATORS
// =============================================================================

/// Maps block proposers to the EVM address that receives `COINBASE`.
pub trait ValidatorSet {
    /// Operator address of the validator with the given consensus address.
    fn operator_address(&self, consensus_address: &[u8]) -> Option<Address>;
}

// =============================================================================
// INTERPRETER
// =============================================================================

/// Outcome of running one message through an interpreter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterpreterResult {
    /// Gas consumed by execution (excluding intrinsic gas).
    pub gas_used: u64,
    /// Raw refund counter accumulated during execution.
    pub refund: u64,
    /// Return data, or revert data on failure.
    pub return_data: Bytes,
    /// True when execution failed and its writes must be discarded.
    pub reverted: bool,
    /// Failure description.
    pub vm_error: Option<String>,
    /// Address of the deployed contract for successful creations.
    pub created: Option<Address>,
}

impl InterpreterResult {
    /// Successful result.
    #[must_use]
    pub fn success(gas_used: u64, return_data: Bytes) -> Self {
        Self {
            gas_used,
            return_data,
            ..Self::default()
        }
    }

    /// Failed result.
    #[must_use]
    pub fn failure(gas_used: u64, error: impl Into<String>) -> Self {
        Self {
            gas_used,
            reverted: true,
            vm_error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Callbacks available to an interpreter while it runs a message.
pub trait Host {
    /// Block being executed.
    fn block(&self) -> &BlockContext;

    /// `BLOCKHASH` for `height` (zero when unknown).
    fn block_hash(&mut self, height: u64) -> Hash;

    /// Scoped state.
    fn state(&mut self) -> &mut dyn StateDb;

    /// Runs the precompile at `address`. `None` if there is none.
    fn call_precompile(
        &mut self,
        address: &Address,
        input: &[u8],
        caller: &Address,
        value: U256,
        gas_limit: u64,
        is_static: bool,
    ) -> Option<Result<PrecompileOutput, PrecompileError>>;
}

/// Executes a message body after the engine has charged intrinsic gas.
pub trait Interpreter {
    /// Runs `msg` with `gas` available. Never returns more `gas_used` than
    /// `gas`; the engine treats a violation as an accounting error.
    fn execute(
        &self,
        config: &ExecutionConfig,
        msg: &Message,
        gas: u64,
        host: &mut dyn Host,
    ) -> InterpreterResult;
}

// =============================================================================
// TRACER
// =============================================================================

/// Observer notified around each message.
pub trait Tracer: Send + Sync {
    /// Called after validation, before gas is bought.
    fn on_message_start(&self, msg: &Message, block: &BlockContext);

    /// Called once the receipt is final.
    fn on_message_end(&self, receipt: &Receipt);
}
