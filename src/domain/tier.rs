//! Subscription tiers and the tier gate.
//!
//! Gating is set membership over an access-rule table, not an ordinal
//! comparison: some features are "Pro or Premium", others "Premium only",
//! which no single threshold expresses.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::domain::error::FlowError;

/// Subscription levels, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Free,
    Pro,
    Premium,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Pro, Tier::Premium];

    /// Canonical lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Premium => "premium",
        }
    }

    /// Parse a tier from its identifier.
    pub fn from_name(name: &str) -> Option<Tier> {
        match name.to_lowercase().as_str() {
            "free" => Some(Tier::Free),
            "pro" => Some(Tier::Pro),
            "premium" => Some(Tier::Premium),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One feature's unlock rule: the set of tiers allowed to use it.
#[derive(Debug, Clone)]
pub struct AccessRule {
    /// Feature identifier (flow name or UI surface id).
    pub feature: String,
    /// Tiers that unlock the feature.
    pub tiers: BTreeSet<Tier>,
}

impl AccessRule {
    /// Build a rule from any collection of tiers.
    pub fn new(feature: impl Into<String>, tiers: impl IntoIterator<Item = Tier>) -> Self {
        Self { feature: feature.into(), tiers: tiers.into_iter().collect() }
    }
}

/// Pure decision table mapping features to the tiers that unlock them.
///
/// Read-only after construction; consulted per decision, never cached by
/// callers. The gate answers visibility questions only — it never invokes
/// flows or touches their output.
#[derive(Debug, Default)]
pub struct TierGate {
    rules: HashMap<String, BTreeSet<Tier>>,
}

impl TierGate {
    /// Build a gate from access rules. A feature listed twice keeps the
    /// union of its tier sets.
    pub fn new(rules: impl IntoIterator<Item = AccessRule>) -> Self {
        let mut table: HashMap<String, BTreeSet<Tier>> = HashMap::new();
        for rule in rules {
            table.entry(rule.feature).or_default().extend(rule.tiers);
        }
        Self { rules: table }
    }

    /// Whether `feature` is unlocked for `tier`.
    ///
    /// Total over registered features. An unregistered feature is a wiring
    /// bug that `verify_features` should have caught at startup; at call
    /// time it is treated as locked and logged rather than panicking.
    pub fn is_unlocked(&self, tier: Tier, feature: &str) -> bool {
        match self.rules.get(feature) {
            Some(tiers) => tiers.contains(&tier),
            None => {
                tracing::warn!(feature, "access check against unregistered feature");
                false
            }
        }
    }

    /// Features `tier` cannot use, for presentation-layer enumeration
    /// (locked cards, blurred panels, upgrade prompts).
    pub fn locked_features(&self, tier: Tier) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|(_, tiers)| !tiers.contains(&tier))
            .map(|(feature, _)| feature.clone())
            .collect()
    }

    /// Startup wiring check: every identifier in `required` must have a
    /// rule. Fails with `UnknownFeature` on the first gap.
    pub fn verify_features<'a>(
        &self,
        required: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), FlowError> {
        for feature in required {
            if !self.rules.contains_key(feature) {
                return Err(FlowError::UnknownFeature(feature.to_string()));
            }
        }
        Ok(())
    }

    /// All registered feature identifiers.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}
