use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Canonical service-speed tier a free-text plan label falls into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Tier500,
    Tier800,
    Tier1Gig,
    #[default]
    Unclassified,
}

impl PlanTier {
    /// Classified tiers in display order.
    pub const fn ordered() -> [Self; 3] {
        [Self::Tier500, Self::Tier800, Self::Tier1Gig]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tier500 => "500 Mega",
            Self::Tier800 => "800 Mega (was 600 Mega through April)",
            Self::Tier1Gig => "1 Giga (was 700 Mega through April)",
            Self::Unclassified => "Unclassified",
        }
    }

    pub const fn is_classified(self) -> bool {
        !matches!(self, Self::Unclassified)
    }
}

/// Ordered (pattern, tier) pairs; the first pattern that matches wins.
const TIER_PATTERNS: &[(&str, PlanTier)] = &[
    (r"\b500\b", PlanTier::Tier500),
    (r"\b600\b", PlanTier::Tier800),
    (r"\b800\b", PlanTier::Tier800),
    (r"\b700\b", PlanTier::Tier1Gig),
    (r"\b1\s?gb\b", PlanTier::Tier1Gig),
];

struct TierRule {
    pattern: Regex,
    tier: PlanTier,
}

static TIER_RULES: OnceLock<Vec<TierRule>> = OnceLock::new();

fn tier_rules() -> &'static [TierRule] {
    TIER_RULES.get_or_init(|| {
        TIER_PATTERNS
            .iter()
            .map(|&(pattern, tier)| TierRule {
                pattern: Regex::new(pattern).expect("valid tier pattern"),
                tier,
            })
            .collect()
    })
}

/// Classifies a plan label. Matching is case-insensitive and token based, so
/// `1500` never counts as `500`.
pub fn categorize(label: &str) -> PlanTier {
    let lowered = label.to_lowercase();
    tier_rules()
        .iter()
        .find(|rule| rule.pattern.is_match(&lowered))
        .map(|rule| rule.tier)
        .unwrap_or(PlanTier::Unclassified)
}

/// The rule table in evaluation order, for auditing.
pub fn rules() -> impl Iterator<Item = (&'static str, PlanTier)> {
    TIER_PATTERNS.iter().copied()
}
