//! # Chain Rules
//!
//! Fork activation heights and the per-block rule flags derived from them.

use serde::{Deserialize, Deserializer, Serialize};

/// Activation heights of the hard forks the engine cares about.
///
/// `None` means the fork never activates. Heights are inclusive.
///
/// When deserializing, a fork left out inherits the height of the fork before
/// it, so `{ london = 100 }` delays London and everything after it. The first
/// fork defaults to genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PartialForkSchedule")]
pub struct ForkSchedule {
    /// Homestead (creation base cost).
    pub homestead: Option<u64>,
    /// Istanbul (EIP-2028 calldata pricing).
    pub istanbul: Option<u64>,
    /// Berlin (EIP-2930 access lists).
    pub berlin: Option<u64>,
    /// London (EIP-1559 fees, EIP-3529 refund quotient).
    pub london: Option<u64>,
    /// Shanghai (EIP-3860 init code metering).
    pub shanghai: Option<u64>,
}

/// Fork table as written. The outer `None` marks a fork left out, the inner
/// one a fork that never activates.
#[derive(Default, Deserialize)]
#[serde(default)]
#[allow(clippy::option_option)]
struct PartialForkSchedule {
    #[serde(deserialize_with = "explicit")]
    homestead: Option<Option<u64>>,
    #[serde(deserialize_with = "explicit")]
    istanbul: Option<Option<u64>>,
    #[serde(deserialize_with = "explicit")]
    berlin: Option<Option<u64>>,
    #[serde(deserialize_with = "explicit")]
    london: Option<Option<u64>>,
    #[serde(deserialize_with = "explicit")]
    shanghai: Option<Option<u64>>,
}

#[allow(clippy::option_option)]
fn explicit<'de, D>(deserializer: D) -> Result<Option<Option<u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u64>::deserialize(deserializer).map(Some)
}

impl From<PartialForkSchedule> for ForkSchedule {
    fn from(partial: PartialForkSchedule) -> Self {
        let mut previous = Some(0);
        let mut resolve = |written: Option<Option<u64>>| {
            let height = written.unwrap_or(previous);
            previous = height;
            height
        };
        Self {
            homestead: resolve(partial.homestead),
            istanbul: resolve(partial.istanbul),
            berlin: resolve(partial.berlin),
            london: resolve(partial.london),
            shanghai: resolve(partial.shanghai),
        }
    }
}

impl ForkSchedule {
    /// Every fork active from genesis.
    #[must_use]
    pub const fn all_active() -> Self {
        Self {
            homestead: Some(0),
            istanbul: Some(0),
            berlin: Some(0),
            london: Some(0),
            shanghai: Some(0),
        }
    }

    /// No fork ever active (frontier rules).
    #[must_use]
    pub const fn frontier() -> Self {
        Self {
            homestead: None,
            istanbul: None,
            berlin: None,
            london: None,
            shanghai: None,
        }
    }

    /// Forks must activate in order. Returns the first out-of-order pair.
    #[must_use]
    pub fn first_disorder(&self) -> Option<(&'static str, &'static str)> {
        let forks = [
            ("homestead", self.homestead),
            ("istanbul", self.istanbul),
            ("berlin", self.berlin),
            ("london", self.london),
            ("shanghai", self.shanghai),
        ];
        forks.windows(2).find_map(|pair| match (pair[0].1, pair[1].1) {
            (Some(earlier), Some(later)) if later < earlier => Some((pair[0].0, pair[1].0)),
            (None, Some(_)) => Some((pair[0].0, pair[1].0)),
            _ => None,
        })
    }

    /// Derives the rule flags for a block.
    #[must_use]
    pub fn rules(&self, chain_id: u64, height: u64) -> ChainRules {
        let active = |fork: Option<u64>| fork.is_some_and(|at| height >= at);
        ChainRules {
            chain_id,
            is_homestead: active(self.homestead),
            is_istanbul: active(self.istanbul),
            is_berlin: active(self.berlin),
            is_london: active(self.london),
            is_shanghai: active(self.shanghai),
        }
    }
}

impl Default for ForkSchedule {
    fn default() -> Self {
        Self::all_active()
    }
}

/// Rule flags in force for one block. Computed once per block and passed
/// explicitly to everything that depends on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ChainRules {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Homestead active.
    pub is_homestead: bool,
    /// EIP-2028 calldata pricing active.
    pub is_istanbul: bool,
    /// Access lists accepted.
    pub is_berlin: bool,
    /// Dynamic fees accepted, refund quotient 5.
    pub is_london: bool,
    /// Init code metered and capped.
    pub is_shanghai: bool,
}

impl ChainRules {
    /// Refund quotient before London (EIP-3529 lowered the cap).
    pub const REFUND_QUOTIENT_FRONTIER: u64 = 2;
    /// Refund quotient from London.
    pub const REFUND_QUOTIENT_LONDON: u64 = 5;

    /// Max refund divisor in force.
    #[must_use]
    pub const fn refund_quotient(&self) -> u64 {
        if self.is_london {
            Self::REFUND_QUOTIENT_LONDON
        } else {
            Self::REFUND_QUOTIENT_FRONTIER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_follow_heights() {
        let schedule = ForkSchedule {
            london: Some(100),
            shanghai: Some(200),
            ..ForkSchedule::all_active()
        };
        let before = schedule.rules(9000, 99);
        assert!(before.is_berlin);
        assert!(!before.is_london);
        assert_eq!(before.refund_quotient(), 2);

        let after = schedule.rules(9000, 100);
        assert!(after.is_london);
        assert!(!after.is_shanghai);
        assert_eq!(after.refund_quotient(), 5);
    }

    #[test]
    fn test_frontier_has_nothing() {
        let rules = ForkSchedule::frontier().rules(1, 1_000_000);
        assert_eq!(rules, ChainRules { chain_id: 1, ..ChainRules::default() });
    }

    #[test]
    fn test_disorder_detected() {
        assert_eq!(ForkSchedule::all_active().first_disorder(), None);
        let schedule = ForkSchedule {
            berlin: Some(10),
            london: Some(5),
            ..ForkSchedule::all_active()
        };
        assert_eq!(schedule.first_disorder(), Some(("berlin", "london")));
        let gap = ForkSchedule {
            istanbul: None,
            ..ForkSchedule::all_active()
        };
        assert_eq!(gap.first_disorder(), Some(("istanbul", "berlin")));
    }

    #[test]
    fn test_omitted_forks_follow_previous() {
        let schedule: ForkSchedule = serde_json::from_str(r#"{"london": 100}"#).unwrap();
        assert_eq!(schedule.homestead, Some(0));
        assert_eq!(schedule.berlin, Some(0));
        assert_eq!(schedule.london, Some(100));
        assert_eq!(schedule.shanghai, Some(100));
        assert_eq!(schedule.first_disorder(), None);

        let empty: ForkSchedule = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ForkSchedule::all_active());
    }

    #[test]
    fn test_explicit_never_carries_forward() {
        let schedule: ForkSchedule =
            serde_json::from_str(r#"{"berlin": 5, "london": null}"#).unwrap();
        assert_eq!(schedule.berlin, Some(5));
        assert_eq!(schedule.london, None);
        assert_eq!(schedule.shanghai, None);
        assert_eq!(schedule.first_disorder(), None);
    }

    #[test]
    fn test_json_round_trip_keeps_never() {
        let schedule = ForkSchedule {
            london: None,
            shanghai: None,
            ..ForkSchedule::all_active()
        };
        let json = serde_json::to_string(&schedule).unwrap();
        assert_eq!(serde_json::from_str::<ForkSchedule>(&json).unwrap(), schedule);
    }
}
