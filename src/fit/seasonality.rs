//! Seasonality selection.
//!
//! `Auto` enables a component only when the history can identify it:
//!
//! | component | period (days) | order | auto rule |
//! |---|---|---|---|
//! | yearly | 365.25 | 10 | span >= 730 days |
//! | weekly | 7 | 3 | span >= 14 days and sampling finer than weekly |
//! | daily | 1 | 4 | span >= 2 days and sampling finer than daily |

use tracing::debug;

use crate::domain::{ModelConfig, Seasonality};
use crate::models::SeasonalTerm;

struct Candidate {
    name: &'static str,
    period_days: f64,
    order: usize,
    min_span_days: f64,
}

const YEARLY: Candidate = Candidate {
    name: "yearly",
    period_days: 365.25,
    order: 10,
    min_span_days: 730.0,
};
const WEEKLY: Candidate = Candidate {
    name: "weekly",
    period_days: 7.0,
    order: 3,
    min_span_days: 14.0,
};
const DAILY: Candidate = Candidate {
    name: "daily",
    period_days: 1.0,
    order: 4,
    min_span_days: 2.0,
};

/// Choose seasonal terms for a history of `span_days` whose smallest gap
/// between consecutive observations is `min_step_days`.
pub fn select_seasonalities(config: &ModelConfig, span_days: f64, min_step_days: f64) -> Vec<SeasonalTerm> {
    let mut out = Vec::new();
    for (candidate, mode) in [(YEARLY, config.yearly), (WEEKLY, config.weekly), (DAILY, config.daily)] {
        let enabled = match mode {
            Seasonality::On => true,
            Seasonality::Off => false,
            Seasonality::Auto => {
                span_days >= candidate.min_span_days
                    && (candidate.name == "yearly" || min_step_days < candidate.period_days)
            }
        };
        debug!(seasonality = candidate.name, enabled, span_days, "seasonality selection");
        if enabled {
            out.push(SeasonalTerm {
                name: candidate.name.to_string(),
                period_days: candidate.period_days,
                order: candidate.order,
            });
        }
    }
    out
}

/// `config` with every seasonal mode fixed to the components in `terms`.
///
/// Refits on a subset of the history (backtest folds) use this so they keep
/// the components the full-history fit selected.
pub fn pin_seasonalities(config: &ModelConfig, terms: &[SeasonalTerm]) -> ModelConfig {
    let mode = |name: &str| {
        if terms.iter().any(|t| t.name == name) {
            Seasonality::On
        } else {
            Seasonality::Off
        }
    };
    ModelConfig {
        yearly: mode(YEARLY.name),
        weekly: mode(WEEKLY.name),
        daily: mode(DAILY.name),
        ..config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(terms: &[SeasonalTerm]) -> Vec<&str> {
        terms.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn auto_selection_follows_history_length() {
        let cfg = ModelConfig::default();
        let hourly = 1.0 / 24.0;
        assert!(select_seasonalities(&cfg, 1.5, hourly).is_empty());
        assert_eq!(names(&select_seasonalities(&cfg, 3.0, hourly)), vec!["daily"]);
        assert_eq!(names(&select_seasonalities(&cfg, 40.0, hourly)), vec!["weekly", "daily"]);
        assert_eq!(
            names(&select_seasonalities(&cfg, 800.0, hourly)),
            vec!["yearly", "weekly", "daily"]
        );
        // Daily sampling cannot identify a daily cycle.
        assert_eq!(names(&select_seasonalities(&cfg, 40.0, 1.0)), vec!["weekly"]);
    }

    #[test]
    fn explicit_modes_override_auto() {
        let cfg = ModelConfig {
            yearly: Seasonality::On,
            daily: Seasonality::Off,
            ..ModelConfig::default()
        };
        assert_eq!(names(&select_seasonalities(&cfg, 40.0, 1.0 / 24.0)), vec!["yearly", "weekly"]);
    }

    #[test]
    fn pinned_config_ignores_history_length() {
        let hourly = 1.0 / 24.0;
        let full = select_seasonalities(&ModelConfig::default(), 40.0, hourly);
        let pinned = pin_seasonalities(&ModelConfig::default(), &full);
        assert_eq!(pinned.yearly, Seasonality::Off);
        assert_eq!(names(&select_seasonalities(&pinned, 3.0, hourly)), vec!["weekly", "daily"]);
        assert_eq!(pinned.interval_width, ModelConfig::default().interval_width);
    }
}
