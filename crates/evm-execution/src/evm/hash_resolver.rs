//! # Block Hash Resolution
//!
//! Answers `BLOCKHASH`. Unknown hashes are the zero hash, never an error:
//! a contract asking for a pruned or future block simply gets zero.

use crate::domain::entities::{BlockContext, BlockHeader};
use crate::domain::services::header_hash;
use crate::domain::value_objects::Hash;
use crate::ports::outbound::HeaderStore;
use tracing::{debug, warn};

/// Resolves block hashes from the current context and historical headers.
pub struct HashResolver<'a> {
    headers: &'a dyn HeaderStore,
}

impl<'a> HashResolver<'a> {
    /// Creates a resolver over `headers`.
    #[must_use]
    pub fn new(headers: &'a dyn HeaderStore) -> Self {
        Self { headers }
    }

    /// Hash of block `height` as seen from `ctx`.
    #[must_use]
    pub fn resolve(&self, ctx: &BlockContext, height: u64) -> Hash {
        match height.cmp(&ctx.height) {
            std::cmp::Ordering::Equal => Self::current(ctx),
            std::cmp::Ordering::Less => self.historical(height),
            std::cmp::Ordering::Greater => Hash::ZERO,
        }
    }

    fn current(ctx: &BlockContext) -> Hash {
        if let Some(hash) = ctx.header_hash.filter(|h| !h.is_zero()) {
            return hash;
        }

        let Some(raw) = ctx.header.as_deref() else {
            debug!(height = ctx.height, "no header in context");
            return Hash::ZERO;
        };
        match BlockHeader::decode(raw) {
            Some(header) if header.is_valid() => header_hash(&header),
            _ => {
                warn!(height = ctx.height, "invalid current header, returning zero hash");
                Hash::ZERO
            }
        }
    }

    fn historical(&self, height: u64) -> Hash {
        let Some(entry) = self.headers.historical_header(height) else {
            debug!(height, "historical header not found");
            return Hash::ZERO;
        };

        let header = match BlockHeader::decode(&entry.header) {
            Some(header) if header.is_valid() && header.height == height => header,
            _ => {
                warn!(height, "invalid historical header, returning zero hash");
                return Hash::ZERO;
            }
        };

        let computed = header_hash(&header);
        if !entry.hash.is_zero() && entry.hash != computed {
            warn!(
                height,
                stored = %entry.hash,
                computed = %computed,
                "stored header hash mismatch"
            );
            return Hash::ZERO;
        }
        computed
    }
}
