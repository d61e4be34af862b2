//! Ground-truth label normalization.
//!
//! Each benchmark encodes anomalies differently. A [`DatasetProfile`] maps to
//! an ordered list of [`RemapRule`]s; rules are applied to every label value
//! in order, so later rules see values already rewritten by earlier ones.
//! The rule list is folded into a 256-entry lookup table and each mask is
//! then rewritten in a single pass.

use crate::{
    config::DatasetProfile,
    maps::{NormalizedMask, RawMask, IGNORE, IN_DISTRIBUTION, OUT_OF_DISTRIBUTION},
};

/// Condition a label value must satisfy for a rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPredicate {
    /// The value equals the given label.
    Equals(u8),
    /// The value is strictly below the bound.
    Below(u8),
    /// The value lies strictly between the two bounds.
    Between { low: u8, high: u8 },
}

impl LabelPredicate {
    pub const fn matches(self, value: u8) -> bool {
        match self {
            Self::Equals(label) => value == label,
            Self::Below(bound) => value < bound,
            Self::Between { low, high } => value > low && value < high,
        }
    }
}

/// Rewrites every value matching `predicate` to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapRule {
    pub predicate: LabelPredicate,
    pub target: u8,
}

impl RemapRule {
    pub const fn new(predicate: LabelPredicate, target: u8) -> Self {
        Self { predicate, target }
    }

    const fn apply(self, value: u8) -> u8 {
        if self.predicate.matches(value) {
            self.target
        } else {
            value
        }
    }
}

const ROAD_ANOMALY_RULES: &[RemapRule] = &[RemapRule::new(
    LabelPredicate::Equals(2),
    OUT_OF_DISTRIBUTION,
)];

const LOST_AND_FOUND_RULES: &[RemapRule] = &[
    RemapRule::new(LabelPredicate::Equals(0), IGNORE),
    RemapRule::new(LabelPredicate::Equals(1), IN_DISTRIBUTION),
    RemapRule::new(
        LabelPredicate::Between { low: 1, high: 201 },
        OUT_OF_DISTRIBUTION,
    ),
];

// Values >= 20 other than 255 are not remapped and stay out of both pools.
const STREET_HAZARD_RULES: &[RemapRule] = &[
    RemapRule::new(LabelPredicate::Equals(14), IGNORE),
    RemapRule::new(LabelPredicate::Below(20), IN_DISTRIBUTION),
    RemapRule::new(LabelPredicate::Equals(IGNORE), OUT_OF_DISTRIBUTION),
];

impl DatasetProfile {
    /// The ordered remap rules for this profile.
    #[must_use]
    pub const fn remap_rules(&self) -> &'static [RemapRule] {
        match self {
            Self::RoadAnomaly => ROAD_ANOMALY_RULES,
            Self::LostAndFound => LOST_AND_FOUND_RULES,
            Self::StreetHazard => STREET_HAZARD_RULES,
            Self::Default => &[],
        }
    }
}

/// A label lookup table built from an ordered rule list.
#[derive(Debug, Clone)]
pub struct LabelNormalizer {
    table: [u8; 256],
}

impl LabelNormalizer {
    /// Builds the lookup table for the given rules.
    pub fn from_rules(rules: &[RemapRule]) -> Self {
        let mut table = [0u8; 256];
        for (value, slot) in (0..=u8::MAX).zip(table.iter_mut()) {
            *slot = rules.iter().fold(value, |v, rule| rule.apply(v));
        }
        Self { table }
    }

    /// Builds the lookup table for a dataset profile.
    pub fn for_profile(profile: &DatasetProfile) -> Self {
        Self::from_rules(profile.remap_rules())
    }

    /// The normalized value of a single raw label.
    pub const fn map_value(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    /// Rewrites a raw mask into the common `{0, 1, 255}` encoding.
    pub fn normalize(&self, raw: &RawMask) -> NormalizedMask {
        let [height, width] = raw.dims();
        let labels = raw.labels().iter().map(|&v| self.map_value(v)).collect();
        let mask = NormalizedMask::from_parts(labels, height, width);

        let unresolved = mask.unresolved_count();
        if unresolved > 0 {
            tracing::warn!(
                unresolved,
                "normalized mask still contains labels outside {{0, 1, 255}}; they are excluded from the metrics"
            );
        }
        mask
    }
}

/// Normalizes `raw` with the rules of `profile`.
pub fn normalize(profile: &DatasetProfile, raw: &RawMask) -> NormalizedMask {
    LabelNormalizer::for_profile(profile).normalize(raw)
}
