//! # Core Domain Entities
//!
//! Messages, block context, receipts and the durable records (token pairs,
//! authorization grants, historical headers) the execution core works with.

use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// MESSAGE
// =============================================================================

/// One entry of an EIP-2930 access list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTuple {
    /// Pre-warmed account.
    pub address: Address,
    /// Pre-warmed storage slots of `address`.
    pub storage_keys: Vec<Hash>,
}

/// Fee terms of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeTerms {
    /// Single gas price (legacy and access-list transactions).
    Legacy {
        /// Price per unit of gas.
        gas_price: U256,
    },
    /// EIP-1559 fee cap and priority tip.
    Dynamic {
        /// Maximum total price per unit of gas.
        fee_cap: U256,
        /// Maximum priority tip per unit of gas.
        tip_cap: U256,
    },
}

impl FeeTerms {
    /// Builds legacy fee terms from a signed decoded price.
    ///
    /// Decoders that carry arbitrary-precision signed integers hand prices in
    /// through here; a negative price never reaches the engine.
    pub fn from_signed_legacy(gas_price: i128) -> Result<Self, ValidationError> {
        let unsigned =
            u128::try_from(gas_price).map_err(|_| ValidationError::NegativeGasPrice(gas_price))?;
        Ok(Self::Legacy {
            gas_price: U256::from(unsigned),
        })
    }

    /// Price actually paid per unit of gas given the block base fee.
    ///
    /// Legacy: the gas price. Dynamic: `min(fee_cap, base_fee + tip_cap)`.
    #[must_use]
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match *self {
            Self::Legacy { gas_price } => gas_price,
            Self::Dynamic { fee_cap, tip_cap } => match base_fee {
                Some(base) => fee_cap.min(base.saturating_add(tip_cap)),
                None => fee_cap,
            },
        }
    }

    /// Highest price the sender may be charged. A legacy gas price is its
    /// own cap; checked against the block base fee during validation.
    #[must_use]
    pub fn max_gas_price(&self) -> U256 {
        match *self {
            Self::Legacy { gas_price } => gas_price,
            Self::Dynamic { fee_cap, .. } => fee_cap,
        }
    }

    /// Returns true for fee-cap/tip pricing.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }
}

impl Default for FeeTerms {
    fn default() -> Self {
        Self::Legacy {
            gas_price: U256::zero(),
        }
    }
}

/// A decoded EVM message. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender (already recovered from the signature).
    pub from: Address,
    /// Recipient. `None` means contract creation.
    pub to: Option<Address>,
    /// Value transferred in the EVM denomination.
    pub value: U256,
    /// Calldata or init code.
    pub data: Bytes,
    /// Gas limit.
    pub gas_limit: u64,
    /// Fee terms.
    pub fee: FeeTerms,
    /// Sender nonce.
    pub nonce: u64,
    /// EIP-2930 access list.
    pub access_list: Vec<AccessTuple>,
}

impl Message {
    /// Creates a plain call message with legacy pricing and no access list.
    #[must_use]
    pub fn call(
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
        gas_limit: u64,
        gas_price: U256,
        nonce: u64,
    ) -> Self {
        Self {
            from,
            to: Some(to),
            value,
            data,
            gas_limit,
            fee: FeeTerms::Legacy { gas_price },
            nonce,
            access_list: Vec::new(),
        }
    }

    /// Creates a contract creation message with legacy pricing.
    #[must_use]
    pub fn create(
        from: Address,
        value: U256,
        init_code: Bytes,
        gas_limit: u64,
        gas_price: U256,
        nonce: u64,
    ) -> Self {
        Self {
            from,
            to: None,
            value,
            data: init_code,
            gas_limit,
            fee: FeeTerms::Legacy { gas_price },
            nonce,
            access_list: Vec::new(),
        }
    }

    /// Returns a copy with the given access list.
    #[must_use]
    pub fn with_access_list(mut self, access_list: Vec<AccessTuple>) -> Self {
        self.access_list = access_list;
        self
    }

    /// Returns a copy with the given fee terms.
    #[must_use]
    pub fn with_fee(mut self, fee: FeeTerms) -> Self {
        self.fee = fee;
        self
    }

    /// True when the message deploys a contract.
    #[must_use]
    pub const fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

// =============================================================================
// BLOCK CONTEXT
// =============================================================================

/// Read-only view of the block the message executes in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block height.
    pub height: u64,
    /// Block time (unix seconds).
    pub time: u64,
    /// Consensus address of the block proposer.
    pub proposer: Vec<u8>,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// EIP-1559 base fee, when the fee market is active.
    pub base_fee: Option<U256>,
    /// Hash of the current header, when the host has already computed it.
    pub header_hash: Option<Hash>,
    /// Raw encoded current header.
    pub header: Option<Vec<u8>>,
}

impl BlockContext {
    /// Creates a context at the given height and time.
    #[must_use]
    pub fn new(chain_id: u64, height: u64, time: u64) -> Self {
        Self {
            height,
            time,
            chain_id,
            ..Self::default()
        }
    }

    /// Returns a copy with the current header attached.
    #[must_use]
    pub fn with_header(mut self, header: &BlockHeader) -> Self {
        self.header = Some(header.encode());
        self
    }
}

/// Decoded block header, the structure raw header bytes must decode to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Host chain identifier.
    pub chain_id: String,
    /// Block height.
    pub height: u64,
    /// Block time (unix seconds).
    pub time: u64,
    /// Proposer consensus address.
    pub proposer: Vec<u8>,
    /// Hash of the parent header.
    pub parent_hash: Hash,
    /// Application state root after the previous block.
    pub app_hash: Hash,
}

impl BlockHeader {
    /// Canonical encoding (bincode, fixed field order).
    ///
    /// # Panics
    ///
    /// Never in practice: every field has a fixed bincode representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("BlockHeader fields always serialize")
    }

    /// Decodes a header, returning `None` on malformed input.
    #[must_use]
    pub fn decode(raw: &[u8]) -> Option<Self> {
        bincode::deserialize(raw).ok()
    }

    /// Structural validity: a header must name its chain and have a height.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.chain_id.is_empty() && self.height > 0
    }
}

/// Stored header of a past block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalHeader {
    /// Height the header was recorded at.
    pub height: u64,
    /// Hash recorded alongside the header (zero if not recorded).
    pub hash: Hash,
    /// Raw encoded header.
    pub header: Vec<u8>,
}

// =============================================================================
// LOGS & RECEIPTS
// =============================================================================

/// Emitted log (event).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

/// Phases of the per-message state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionPhase {
    /// Nonce, balance and rule-gated checks passed.
    Validated,
    /// Intrinsic gas computed and gas purchased.
    GasComputed,
    /// Interpreter finished successfully.
    Executed,
    /// Interpreter reported failure; execution writes rolled back.
    Reverted,
    /// Refund computed and host meter reconciled.
    Refunded,
    /// Leftover gas returned, fee kept by the collector.
    Settled,
}

/// Result of applying one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Gas charged after refund and minimum-gas floor.
    pub gas_used: u64,
    /// Price per unit of gas actually paid.
    pub effective_gas_price: U256,
    /// Logs in emission order. Empty when reverted.
    pub logs: Vec<Log>,
    /// True when execution failed.
    pub reverted: bool,
    /// Interpreter error message, empty on success.
    pub vm_error: String,
    /// Return data (revert data when reverted).
    pub return_data: Bytes,
    /// Deployed contract address for successful creations.
    pub contract_address: Option<Address>,
    /// Phases traversed, in order.
    pub phases: Vec<TransitionPhase>,
}

impl Receipt {
    /// Last phase reached.
    #[must_use]
    pub fn phase(&self) -> Option<TransitionPhase> {
        self.phases.last().copied()
    }

    /// Fee kept by the collector for this message.
    #[must_use]
    pub fn fee_paid(&self) -> U256 {
        self.effective_gas_price
            .saturating_mul(U256::from(self.gas_used))
    }
}

// =============================================================================
// GAS STATE
// =============================================================================

/// Gas bookkeeping of one in-flight transition.
///
/// ## Invariants
/// - `used <= limit`
/// - the refund counter may exceed `used / quotient` while the interpreter
///   runs, and is clamped by [`GasState::settle_refund`] before settlement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasState {
    limit: u64,
    used: u64,
    refund: u64,
}

impl GasState {
    /// Creates a gas state with nothing consumed.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            used: 0,
            refund: 0,
        }
    }

    /// Returns the gas limit.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns gas used so far.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.used
    }

    /// Returns remaining gas.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Returns the raw refund counter.
    #[must_use]
    pub const fn refund(&self) -> u64 {
        self.refund
    }

    /// Consumes gas. Returns false (and consumes nothing) if insufficient.
    pub fn consume(&mut self, amount: u64) -> bool {
        match self.used.checked_add(amount) {
            Some(total) if total <= self.limit => {
                self.used = total;
                true
            }
            _ => false,
        }
    }

    /// Adds to the raw refund counter.
    pub fn add_refund(&mut self, amount: u64) {
        self.refund = self.refund.saturating_add(amount);
    }

    /// Clamps the refund to `used / quotient`, deducts it from `used` and
    /// returns the refunded amount.
    pub fn settle_refund(&mut self, quotient: u64) -> u64 {
        let refund = crate::evm::gas::compute_refund(self.refund, self.used, quotient);
        self.refund = refund;
        self.used -= refund;
        refund
    }

    /// Raises `used` to at least `floor` (never above the limit).
    pub fn apply_floor(&mut self, floor: u64) {
        self.used = self.used.max(floor.min(self.limit));
    }
}

// =============================================================================
// TOKEN PAIRS
// =============================================================================

/// Who owns the asset behind a token pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// Protocol-level coin owned by the module; backs a native precompile.
    Module,
    /// Arbitrary registered coin; backs a dynamic precompile.
    External,
}

impl OwnerKind {
    /// Short label used in errors and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Module => "native",
            Self::External => "dynamic",
        }
    }
}

/// Binding between a host denomination and an EVM contract address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// EVM contract address.
    pub address: Address,
    /// Host denomination.
    pub denom: String,
    /// Whether the pair is exposed to the EVM.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Owner classification.
    pub owner: OwnerKind,
}

const fn enabled_by_default() -> bool {
    true
}

impl TokenPair {
    /// Creates an enabled token pair.
    #[must_use]
    pub fn new(address: Address, denom: impl Into<String>, owner: OwnerKind) -> Self {
        Self {
            address,
            denom: denom.into(),
            enabled: true,
            owner,
        }
    }
}

// =============================================================================
// AUTHORIZATION GRANTS
// =============================================================================

/// Delegated, limited spending permission from `granter` to `grantee`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGrant {
    /// Account whose funds may be spent.
    pub granter: Address,
    /// Account allowed to spend.
    pub grantee: Address,
    /// Remaining spend limit per denomination.
    pub spend_limit: BTreeMap<String, U256>,
    /// Allowed recipients. Empty means any recipient.
    pub allow_list: Vec<Address>,
    /// Expiration (unix seconds). `None` never expires.
    pub expiration: Option<u64>,
}

impl AuthorizationGrant {
    /// Creates a grant for a single denomination.
    #[must_use]
    pub fn new(
        granter: Address,
        grantee: Address,
        denom: impl Into<String>,
        limit: U256,
        expiration: Option<u64>,
    ) -> Self {
        let mut spend_limit = BTreeMap::new();
        spend_limit.insert(denom.into(), limit);
        Self {
            granter,
            grantee,
            spend_limit,
            allow_list: Vec::new(),
            expiration,
        }
    }

    /// Returns a copy restricted to the given recipients.
    #[must_use]
    pub fn with_allow_list(mut self, allow_list: Vec<Address>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// A grant is expired once block time is strictly past its expiration.
    #[must_use]
    pub fn is_expired(&self, block_time: u64) -> bool {
        self.expiration.is_some_and(|exp| block_time > exp)
    }

    /// Remaining limit for `denom` (zero if absent).
    #[must_use]
    pub fn limit_for(&self, denom: &str) -> U256 {
        self.spend_limit.get(denom).copied().unwrap_or_default()
    }

    /// True when `recipient` may receive funds under this grant.
    #[must_use]
    pub fn allows_recipient(&self, recipient: &Address) -> bool {
        self.allow_list.is_empty() || self.allow_list.contains(recipient)
    }

    /// Sets the limit for `denom`; a zero limit removes the denomination.
    pub fn set_limit(&mut self, denom: &str, limit: U256) {
        if limit.is_zero() {
            self.spend_limit.remove(denom);
        } else {
            self.spend_limit.insert(denom.to_string(), limit);
        }
    }

    /// True when no denomination has a remaining limit.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.spend_limit.values().all(U256::is_zero)
    }
}

// =============================================================================
// TESTS
// =============================================================================
