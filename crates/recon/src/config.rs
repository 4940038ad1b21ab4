use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Tunable thresholds for one reconciliation run.
///
/// Read-only for the duration of a run and passed explicitly into every
/// resolver. Build it with [`ReconConfig::from_toml`], [`ReconConfig::from_preset`]
/// or `Default` (the balanced preset), then call [`ReconConfig::validate`]
/// if any field was edited by hand.
#[derive(Debug, Clone)]
pub struct ReconConfig {
    pub name: String,
    pub preset: ThresholdPreset,
    pub pipeline: Pipeline,
    pub identity: IdentityThresholds,
    pub amount: AmountTolerance,
    pub subset: SubsetLimits,
    pub tax_id: TaxIdConfig,
    pub inputs: InputFiles,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self::from_preset(ThresholdPreset::Balanced)
    }
}

// ---------------------------------------------------------------------------
// Pipeline selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// Fuzzy alias identity + amount resolution + ternary classifier.
    Alias,
    /// Tax identifier keyed reconciler with channel-purity rules.
    TaxId,
    /// Tax-id pipeline when the ledger carries tax ids and channel data,
    /// alias pipeline otherwise.
    #[default]
    Auto,
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alias => write!(f, "alias"),
            Self::TaxId => write!(f, "tax_id"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Named threshold bundles, from strictest to most permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPreset {
    VeryStrict,
    Strict,
    #[default]
    Balanced,
    Flexible,
    VeryFlexible,
}

impl ThresholdPreset {
    pub fn identity(self) -> IdentityThresholds {
        let (exact, fuzzy) = match self {
            Self::VeryStrict => (0.92, 0.70),
            Self::Strict => (0.88, 0.65),
            Self::Balanced => (0.80, 0.55),
            Self::Flexible => (0.77, 0.50),
            Self::VeryFlexible => (0.75, 0.45),
        };
        IdentityThresholds { exact_threshold: exact, fuzzy_threshold: fuzzy }
    }

    pub fn amount(self) -> AmountTolerance {
        let (exact_pct, probable_pct, probable_abs_cents) = match self {
            Self::VeryStrict => (0.002, 0.005, 25_000),
            Self::Strict => (0.003, 0.008, 30_000),
            Self::Balanced => (0.005, 0.010, 50_000),
            Self::Flexible => (0.008, 0.015, 80_000),
            Self::VeryFlexible => (0.010, 0.020, 100_000),
        };
        AmountTolerance { exact_pct, probable_pct, probable_abs_cents }
    }
}

// ---------------------------------------------------------------------------
// Identity + amount
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdentityThresholds {
    /// Score at or above which identity is `exact`.
    pub exact_threshold: f64,
    /// Score at or above which identity is `fuzzy`.
    pub fuzzy_threshold: f64,
}

/// Amount tolerances. Percentages are fractions (0.005 = 0.5%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmountTolerance {
    pub exact_pct: f64,
    pub probable_pct: f64,
    pub probable_abs_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdentityOverrides {
    exact_threshold: Option<f64>,
    fuzzy_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AmountOverrides {
    exact_pct: Option<f64>,
    probable_pct: Option<f64>,
    probable_abs_cents: Option<i64>,
}

// ---------------------------------------------------------------------------
// Subset-sum limits
// ---------------------------------------------------------------------------

/// Hard bounds on the combinatorial search.
///
/// The combination size cap shrinks as the candidate pool grows, and only the
/// `max_candidates` largest entries take part in the enumeration, so the
/// worst case is `C(max_candidates, large_pool_max)` subsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubsetLimits {
    pub small_pool: usize,
    pub small_pool_max: usize,
    pub medium_pool: usize,
    pub medium_pool_max: usize,
    pub large_pool_max: usize,
    pub max_candidates: usize,
}

impl Default for SubsetLimits {
    fn default() -> Self {
        Self {
            small_pool: 12,
            small_pool_max: 8,
            medium_pool: 18,
            medium_pool_max: 6,
            large_pool_max: 5,
            max_candidates: 30,
        }
    }
}

impl SubsetLimits {
    /// Largest combination size searched for a pool of `pool_len` entries.
    pub fn max_size(&self, pool_len: usize) -> usize {
        let cap = if pool_len <= self.small_pool {
            self.small_pool_max
        } else if pool_len <= self.medium_pool {
            self.medium_pool_max
        } else {
            self.large_pool_max
        };
        cap.min(pool_len)
    }
}

// ---------------------------------------------------------------------------
// Tax-id pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaxIdConfig {
    pub tolerance_pct: f64,
    pub tolerance_abs_cents: i64,
    /// ±days for an automatic match.
    pub strict_window_days: u32,
    /// ±days for a suggested match.
    pub loose_window_days: u32,
    /// Channel name identifying the reconciled bank account (e.g. "santander").
    /// When unset, a channel descriptor is pure when all its parts are equal.
    pub account_channel: Option<String>,
    /// Marker of a channel that mixes cash and bank money (e.g. "caja grande").
    pub excluded_channel: Option<String>,
    /// Entry statuses that drop an entry from the preferred candidate set.
    pub deprioritized_statuses: Vec<String>,
    pub homogeneous_confidence: f64,
    pub multiple_confidence: f64,
}

impl Default for TaxIdConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: 0.005,
            tolerance_abs_cents: 100,
            strict_window_days: 30,
            loose_window_days: 45,
            account_channel: None,
            excluded_channel: None,
            deprioritized_statuses: vec!["overdue".into(), "vencido".into()],
            homogeneous_confidence: 85.0,
            multiple_confidence: 75.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Input file paths, relative to the run file. Only the CLI reads these.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputFiles {
    pub transactions: Option<String>,
    pub ledger: Option<String>,
    pub aliases: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    name: String,
    #[serde(default)]
    preset: ThresholdPreset,
    #[serde(default)]
    pipeline: Pipeline,
    #[serde(default)]
    identity: IdentityOverrides,
    #[serde(default)]
    amount: AmountOverrides,
    #[serde(default)]
    subset: SubsetLimits,
    #[serde(default)]
    tax_id: TaxIdConfig,
    #[serde(default)]
    inputs: InputFiles,
}

impl ReconConfig {
    pub fn from_preset(preset: ThresholdPreset) -> Self {
        Self {
            name: "reconciliation".into(),
            preset,
            pipeline: Pipeline::default(),
            identity: preset.identity(),
            amount: preset.amount(),
            subset: SubsetLimits::default(),
            tax_id: TaxIdConfig::default(),
            inputs: InputFiles::default(),
        }
    }

    /// Parse a run file. Explicit `[identity]` / `[amount]` fields override
    /// the values seeded by `preset`.
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let raw: RawConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;

        let mut identity = raw.preset.identity();
        if let Some(v) = raw.identity.exact_threshold {
            identity.exact_threshold = v;
        }
        if let Some(v) = raw.identity.fuzzy_threshold {
            identity.fuzzy_threshold = v;
        }

        let mut amount = raw.preset.amount();
        if let Some(v) = raw.amount.exact_pct {
            amount.exact_pct = v;
        }
        if let Some(v) = raw.amount.probable_pct {
            amount.probable_pct = v;
        }
        if let Some(v) = raw.amount.probable_abs_cents {
            amount.probable_abs_cents = v;
        }

        let config = Self {
            name: raw.name,
            preset: raw.preset,
            pipeline: raw.pipeline,
            identity,
            amount,
            subset: raw.subset,
            tax_id: raw.tax_id,
            inputs: raw.inputs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let unit = |name: &str, v: f64| -> Result<(), ReconError> {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(ReconError::ConfigValidation(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
            Ok(())
        };

        unit("identity.exact_threshold", self.identity.exact_threshold)?;
        unit("identity.fuzzy_threshold", self.identity.fuzzy_threshold)?;
        if self.identity.fuzzy_threshold > self.identity.exact_threshold {
            return Err(ReconError::ConfigValidation(format!(
                "identity.fuzzy_threshold ({}) exceeds identity.exact_threshold ({})",
                self.identity.fuzzy_threshold, self.identity.exact_threshold
            )));
        }

        unit("amount.exact_pct", self.amount.exact_pct)?;
        unit("amount.probable_pct", self.amount.probable_pct)?;
        if self.amount.exact_pct > self.amount.probable_pct {
            return Err(ReconError::ConfigValidation(format!(
                "amount.exact_pct ({}) exceeds amount.probable_pct ({})",
                self.amount.exact_pct, self.amount.probable_pct
            )));
        }
        if self.amount.probable_abs_cents < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "amount.probable_abs_cents must not be negative, got {}",
                self.amount.probable_abs_cents
            )));
        }

        let s = &self.subset;
        for (name, cap) in [
            ("subset.small_pool_max", s.small_pool_max),
            ("subset.medium_pool_max", s.medium_pool_max),
            ("subset.large_pool_max", s.large_pool_max),
            ("subset.max_candidates", s.max_candidates),
        ] {
            if cap < 2 {
                return Err(ReconError::ConfigValidation(format!(
                    "{name} must be at least 2, got {cap}"
                )));
            }
        }
        if s.small_pool > s.medium_pool {
            return Err(ReconError::ConfigValidation(format!(
                "subset.small_pool ({}) exceeds subset.medium_pool ({})",
                s.small_pool, s.medium_pool
            )));
        }

        let t = &self.tax_id;
        unit("tax_id.tolerance_pct", t.tolerance_pct)?;
        if t.tolerance_abs_cents < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "tax_id.tolerance_abs_cents must not be negative, got {}",
                t.tolerance_abs_cents
            )));
        }
        if t.strict_window_days > t.loose_window_days {
            return Err(ReconError::ConfigValidation(format!(
                "tax_id.strict_window_days ({}) exceeds tax_id.loose_window_days ({})",
                t.strict_window_days, t.loose_window_days
            )));
        }
        for (name, v) in [
            ("tax_id.homogeneous_confidence", t.homogeneous_confidence),
            ("tax_id.multiple_confidence", t.multiple_confidence),
        ] {
            if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                return Err(ReconError::ConfigValidation(format!(
                    "{name} must be within [0, 100], got {v}"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "December close"
"#;

    #[test]
    fn minimal_uses_balanced_preset() {
        let config = ReconConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "December close");
        assert_eq!(config.preset, ThresholdPreset::Balanced);
        assert_eq!(config.pipeline, Pipeline::Auto);
        assert_eq!(config.identity.exact_threshold, 0.80);
        assert_eq!(config.identity.fuzzy_threshold, 0.55);
        assert_eq!(config.amount.exact_pct, 0.005);
        assert_eq!(config.amount.probable_abs_cents, 50_000);
        assert_eq!(config.subset, SubsetLimits::default());
        assert!(config.inputs.transactions.is_none());
    }

    #[test]
    fn explicit_fields_override_preset() {
        let input = r#"
name = "Strict run"
preset = "very_strict"
pipeline = "alias"

[identity]
fuzzy_threshold = 0.6

[amount]
probable_abs_cents = 1000

[inputs]
transactions = "bank.csv"
ledger = "ledger.csv"
aliases = "aliases.csv"
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        assert_eq!(config.pipeline, Pipeline::Alias);
        // Seeded by preset
        assert_eq!(config.identity.exact_threshold, 0.92);
        assert_eq!(config.amount.exact_pct, 0.002);
        // Overridden
        assert_eq!(config.identity.fuzzy_threshold, 0.6);
        assert_eq!(config.amount.probable_abs_cents, 1000);
        assert_eq!(config.inputs.aliases.as_deref(), Some("aliases.csv"));
    }

    #[test]
    fn parse_tax_id_section() {
        let input = r#"
name = "Santander"
pipeline = "tax_id"

[tax_id]
account_channel = "santander"
excluded_channel = "caja grande"
strict_window_days = 20
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        assert_eq!(config.tax_id.account_channel.as_deref(), Some("santander"));
        assert_eq!(config.tax_id.excluded_channel.as_deref(), Some("caja grande"));
        assert_eq!(config.tax_id.strict_window_days, 20);
        assert_eq!(config.tax_id.loose_window_days, 45);
        assert_eq!(config.tax_id.tolerance_abs_cents, 100);
    }

    #[test]
    fn subset_cap_shrinks_with_pool() {
        let limits = SubsetLimits::default();
        assert_eq!(limits.max_size(3), 3);
        assert_eq!(limits.max_size(12), 8);
        assert_eq!(limits.max_size(15), 6);
        assert_eq!(limits.max_size(40), 5);
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = r#"
name = "Bad"
[amount]
probable_abs_cents = -5
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("must not be negative"));
    }

    #[test]
    fn reject_inverted_identity_thresholds() {
        let input = r#"
name = "Bad"
[identity]
exact_threshold = 0.5
fuzzy_threshold = 0.7
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("exceeds identity.exact_threshold"));
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let mut config = ReconConfig::default();
        config.identity.exact_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("within [0, 1]"));
    }

    #[test]
    fn reject_subset_cap_below_two() {
        let input = r#"
name = "Bad"
[subset]
large_pool_max = 1
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("subset.large_pool_max"));
    }

    #[test]
    fn reject_inverted_windows() {
        let mut config = ReconConfig::default();
        config.tax_id.strict_window_days = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_pipeline() {
        let input = r#"
name = "Bad"
pipeline = "cuit"
"#;
        assert!(matches!(
            ReconConfig::from_toml(input),
            Err(ReconError::ConfigParse(_))
        ));
    }
}
