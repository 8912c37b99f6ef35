//! Multi-floor disambiguation
//!
//! ## Scoring
//!
//! Each floor is scored from the recent raw series of its gateways. A
//! gateway contributes when it has at least 3 samples; its level is the mean
//! of its last 5. Over the contributing gateways:
//!
//! ```text
//! score = 0.6·max_rssi + 0.3·avg_rssi + 2·gateway_count
//! ```
//!
//! ## Decision
//!
//! With fewer than two scored floors there is nothing to compare and the
//! beacon's floor is undetectable. Otherwise floors are ranked by score
//! (ties keep floor order) and the first matching rule wins:
//!
//! 1. best `max_rssi` beats the runner-up's by at least 15 dB: best
//! 2. `score(best) / max(score(second), 0.1) >= 1.5`: best
//! 3. a floor with a single gateway hearing the beacon above -50 dBm: that
//!    floor (checked over every scored floor, in floor order)
//! 4. best
//!
//! Scores are usually negative, in which case rule 2 cannot fire. That is
//! the calibrated behavior and is kept.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::{
    constants::floor::{
        FLOOR_MIN_SAMPLES, FLOOR_RECENT_WINDOW, FLOOR_RSSI_MARGIN_DB, FLOOR_SCORE_RATIO,
        FLOOR_SCORE_RATIO_FLOOR, SCORE_WEIGHT_AVG_RSSI, SCORE_WEIGHT_GATEWAY_COUNT,
        SCORE_WEIGHT_MAX_RSSI, SINGLE_GATEWAY_OVERRIDE_DBM,
    },
    deployment::{Deployment, FloorId},
    errors::{LocalizationError, LocalizationResult},
};

/// Raw RSSI series per gateway, per floor
pub type FloorData<'a> = BTreeMap<FloorId, BTreeMap<&'a str, Vec<f64>>>;

/// Signal aggregate for one floor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloorScore {
    /// Strongest gateway level (dBm)
    pub max_rssi: f64,
    /// Mean gateway level (dBm)
    pub avg_rssi: f64,
    /// Gateways with enough samples
    pub gateway_count: usize,
    /// Composite score
    pub score: f64,
}

/// Which rule settled the floor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FloorRule {
    /// Strongest gateway clearly louder than on the runner-up floor
    RssiMargin,
    /// Composite score clearly higher
    ScoreRatio,
    /// Lone gateway on a floor hearing the beacon at close range
    SingleGateway,
    /// No rule matched, top score taken
    BestScore,
}

/// Floor decision with the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloorDecision {
    /// Chosen floor
    pub floor: FloorId,
    /// Rule that chose it
    pub rule: FloorRule,
}

/// Floor disambiguator with tunable thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloorSelector {
    /// Rule 1 margin (dB)
    pub rssi_margin_db: f64,
    /// Rule 2 score ratio
    pub score_ratio: f64,
    /// Rule 3 level a lone gateway must exceed (dBm)
    pub single_gateway_dbm: f64,
    /// Samples a gateway needs to count
    pub min_samples: usize,
    /// Trailing samples averaged per gateway
    pub recent_window: usize,
}

impl Default for FloorSelector {
    fn default() -> Self {
        Self {
            rssi_margin_db: FLOOR_RSSI_MARGIN_DB,
            score_ratio: FLOOR_SCORE_RATIO,
            single_gateway_dbm: SINGLE_GATEWAY_OVERRIDE_DBM,
            min_samples: FLOOR_MIN_SAMPLES,
            recent_window: FLOOR_RECENT_WINDOW,
        }
    }
}

impl FloorSelector {
    /// Score one floor from its gateways' series, `None` if no gateway counts
    pub fn score_floor<'s, I>(&self, series: I) -> Option<FloorScore>
    where
        I: IntoIterator<Item = &'s [f64]>,
    {
        let levels: Vec<f64> = series
            .into_iter()
            .filter(|values| values.len() >= self.min_samples && !values.is_empty())
            .map(|values| {
                let recent = &values[values.len().saturating_sub(self.recent_window.max(1))..];
                recent.iter().sum::<f64>() / recent.len() as f64
            })
            .collect();

        if levels.is_empty() {
            return None;
        }

        let max_rssi = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg_rssi = levels.iter().sum::<f64>() / levels.len() as f64;
        let gateway_count = levels.len();
        Some(FloorScore {
            max_rssi,
            avg_rssi,
            gateway_count,
            score: SCORE_WEIGHT_MAX_RSSI * max_rssi
                + SCORE_WEIGHT_AVG_RSSI * avg_rssi
                + SCORE_WEIGHT_GATEWAY_COUNT * gateway_count as f64,
        })
    }

    /// Apply the decision rules to precomputed scores (in floor order)
    ///
    /// `configured_gateways` gives each floor's configured gateway count for
    /// rule 3; floors missing from it use their scored count.
    pub fn decide(
        &self,
        scores: &[(FloorId, FloorScore)],
        configured_gateways: Option<&BTreeMap<FloorId, usize>>,
    ) -> LocalizationResult<FloorDecision> {
        if scores.len() < 2 {
            return Err(LocalizationError::FloorUndetectable { scored: scores.len() });
        }

        let mut ranked: Vec<&(FloorId, FloorScore)> = scores.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(core::cmp::Ordering::Equal)
        });
        let (best_floor, best) = *ranked[0];
        let (_, second) = *ranked[1];

        if best.max_rssi - second.max_rssi >= self.rssi_margin_db {
            return Ok(FloorDecision { floor: best_floor, rule: FloorRule::RssiMargin });
        }

        if best.score / second.score.max(FLOOR_SCORE_RATIO_FLOOR) >= self.score_ratio {
            return Ok(FloorDecision { floor: best_floor, rule: FloorRule::ScoreRatio });
        }

        for (floor, score) in scores {
            let gateways = configured_gateways
                .and_then(|counts| counts.get(floor).copied())
                .unwrap_or(score.gateway_count);
            if gateways == 1 && score.max_rssi > self.single_gateway_dbm {
                return Ok(FloorDecision { floor: *floor, rule: FloorRule::SingleGateway });
            }
        }

        Ok(FloorDecision { floor: best_floor, rule: FloorRule::BestScore })
    }

    fn scores(&self, floor_data: &FloorData<'_>) -> Vec<(FloorId, FloorScore)> {
        floor_data
            .iter()
            .filter_map(|(floor, gateways)| {
                self.score_floor(gateways.values().map(Vec::as_slice))
                    .map(|score| (*floor, score))
            })
            .collect()
    }

    /// Pick the beacon's floor from raw per-floor series
    pub fn select_floor(&self, floor_data: &FloorData<'_>) -> LocalizationResult<FloorDecision> {
        self.decide(&self.scores(floor_data), None)
    }

    /// [`select_floor`](Self::select_floor) using the deployment's gateway
    /// counts for the single-gateway rule
    pub fn select_floor_with_layout(
        &self,
        floor_data: &FloorData<'_>,
        deployment: &Deployment,
    ) -> LocalizationResult<FloorDecision> {
        let scores = self.scores(floor_data);
        let decision = self.decide(&scores, Some(&deployment.gateway_counts()));
        if let Ok(d) = &decision {
            log_debug!("floor {} selected by {:?} among {} scored", d.floor, d.rule, scores.len());
        }
        decision
    }
}
