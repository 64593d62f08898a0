//! # In-Memory Ledger
//!
//! Journaled reference implementation of [`StateDb`](crate::ports::StateDb)
//! for tests and simulations. Every write made while a scope is open is
//! recorded with the value it replaced; rolling a scope back replays those
//! records in reverse.

use crate::domain::entities::{AuthorizationGrant, Log};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::LedgerError;
use crate::ports::outbound::{GrantStore, Ledger, LogSink, ScopeId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

type BalanceKey = (Address, String);
type GrantKey = (Address, Address);

#[derive(Clone, Debug)]
enum JournalEntry {
    AccountCreated(Address),
    Balance { key: BalanceKey, prev: Option<U256> },
    Supply { denom: String, prev: Option<U256> },
    Nonce { address: Address, prev: Option<u64> },
    Code { address: Address, prev: Option<Bytes> },
    Grant { key: GrantKey, prev: Option<AuthorizationGrant> },
}

#[derive(Clone, Copy, Debug)]
struct Checkpoint {
    journal_len: usize,
    logs_len: usize,
}

/// In-memory multi-asset ledger with nested write scopes.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    accounts: BTreeSet<Address>,
    balances: BTreeMap<BalanceKey, U256>,
    supply: BTreeMap<String, U256>,
    nonces: BTreeMap<Address, u64>,
    code: BTreeMap<Address, Bytes>,
    grants: BTreeMap<GrantKey, AuthorizationGrant>,
    logs: Vec<Log>,
    journal: Vec<JournalEntry>,
    scopes: Vec<Checkpoint>,
}

impl InMemoryLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open scopes.
    #[must_use]
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Creates an empty account.
    pub fn create_account(&mut self, address: &Address) {
        self.touch(address);
    }

    /// Issues new coins to `address`, raising the supply.
    pub fn mint(&mut self, address: &Address, denom: &str, amount: U256) {
        self.touch(address);
        let balance = self.balance(address, denom).saturating_add(amount);
        self.write_balance(address, denom, balance);
        let supply = self.total_supply(denom).saturating_add(amount);
        self.write_supply(denom, supply);
    }

    fn record(&mut self, entry: JournalEntry) {
        if !self.scopes.is_empty() {
            self.journal.push(entry);
        }
    }

    fn touch(&mut self, address: &Address) {
        if self.accounts.insert(*address) {
            self.record(JournalEntry::AccountCreated(*address));
        }
    }

    fn write_balance(&mut self, address: &Address, denom: &str, amount: U256) {
        let key = (*address, denom.to_string());
        let prev = self.balances.insert(key.clone(), amount);
        self.record(JournalEntry::Balance { key, prev });
    }

    fn write_supply(&mut self, denom: &str, amount: U256) {
        let prev = self.supply.insert(denom.to_string(), amount);
        self.record(JournalEntry::Supply {
            denom: denom.to_string(),
            prev,
        });
    }

    fn check_innermost(&self, scope: ScopeId) -> Result<(), LedgerError> {
        let innermost = self.scopes.len().checked_sub(1).ok_or(LedgerError::NoOpenScope)?;
        if innermost == scope {
            Ok(())
        } else {
            Err(LedgerError::ScopeMismatch {
                innermost,
                got: scope,
            })
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated(address) => {
                self.accounts.remove(&address);
            }
            JournalEntry::Balance { key, prev } => restore(&mut self.balances, key, prev),
            JournalEntry::Supply { denom, prev } => restore(&mut self.supply, denom, prev),
            JournalEntry::Nonce { address, prev } => restore(&mut self.nonces, address, prev),
            JournalEntry::Code { address, prev } => restore(&mut self.code, address, prev),
            JournalEntry::Grant { key, prev } => restore(&mut self.grants, key, prev),
        }
    }
}

fn restore<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, prev: Option<V>) {
    match prev {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, address: &Address, denom: &str) -> U256 {
        self.balances
            .get(&(*address, denom.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        denom: &str,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let available = self.balance(from, denom);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                address: *from,
                denom: denom.to_string(),
                required: amount,
                available,
            })?;

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance(to, denom)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.touch(to);
        self.write_balance(from, denom, remaining);
        self.write_balance(to, denom, credited);
        trace!(from = ?from, to = ?to, denom, %amount, "ledger transfer");
        Ok(())
    }

    fn total_supply(&self, denom: &str) -> U256 {
        self.supply.get(denom).copied().unwrap_or_default()
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or_default()
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        self.touch(address);
        let prev = self.nonces.insert(*address, nonce);
        self.record(JournalEntry::Nonce {
            address: *address,
            prev,
        });
    }

    fn account_exists(&self, address: &Address) -> bool {
        self.accounts.contains(address)
    }

    fn code(&self, address: &Address) -> Bytes {
        self.code.get(address).cloned().unwrap_or_default()
    }

    fn set_code(&mut self, address: &Address, code: Bytes) {
        self.touch(address);
        let prev = self.code.insert(*address, code);
        self.record(JournalEntry::Code {
            address: *address,
            prev,
        });
    }

    fn begin_scope(&mut self) -> ScopeId {
        self.scopes.push(Checkpoint {
            journal_len: self.journal.len(),
            logs_len: self.logs.len(),
        });
        self.scopes.len() - 1
    }

    fn commit_scope(&mut self, scope: ScopeId) -> Result<(), LedgerError> {
        self.check_innermost(scope)?;
        self.scopes.pop();
        if self.scopes.is_empty() {
            self.journal.clear();
        }
        Ok(())
    }

    fn rollback_scope(&mut self, scope: ScopeId) -> Result<(), LedgerError> {
        self.check_innermost(scope)?;
        let Some(checkpoint) = self.scopes.pop() else {
            return Err(LedgerError::NoOpenScope);
        };
        while self.journal.len() > checkpoint.journal_len {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.logs.truncate(checkpoint.logs_len);
        Ok(())
    }
}

impl GrantStore for InMemoryLedger {
    fn grant(&self, granter: &Address, grantee: &Address) -> Option<AuthorizationGrant> {
        self.grants.get(&(*granter, *grantee)).cloned()
    }

    fn set_grant(&mut self, grant: AuthorizationGrant) {
        let key = (grant.granter, grant.grantee);
        let prev = self.grants.insert(key, grant);
        self.record(JournalEntry::Grant { key, prev });
    }

    fn revoke_grant(&mut self, granter: &Address, grantee: &Address) {
        let key = (*granter, *grantee);
        if let Some(prev) = self.grants.remove(&key) {
            self.record(JournalEntry::Grant {
                key,
                prev: Some(prev),
            });
        }
    }
}

impl LogSink for InMemoryLedger {
    fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }
}
