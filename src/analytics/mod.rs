//! Analytics engine: outcome classification, streak statistics and bet
//! simulation over one crash history.
//!
//! [`streaks::analyze`] and [`simulator::simulate`] are independent leaf
//! stages; [`run_analytics`] feeds both from the same history and
//! threshold, tunes the bet count to the longest observed losing streak,
//! and replays the ledger to project profit/loss.
//!
//! Everything here is synchronous and pure. Any parameter change means a
//! full re-run over the original records.

pub mod simulator;
pub mod streaks;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{AnalyticsResult, CrashRecord};
pub use simulator::{replay, round_money, simulate, SimParams, MAX_SIMULATED_BETS};
pub use streaks::{analyze, ordinal, ordinal_suffix, DEFAULT_THRESHOLD};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Inputs for a full analytics run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsParams {
    /// Crash points at or above this count as wins.
    pub threshold: f64,
    pub start_bet: f64,
    pub escalation_pct: f64,
    /// Payout multiplier. Defaults to `threshold` (cashing out exactly at
    /// the win line).
    pub win_multiplier: Option<f64>,
    /// Explicit bet count. When absent, the longest historical gap between
    /// wins is used, falling back to `default_bet_count`.
    pub bet_count_cap: Option<usize>,
    pub default_bet_count: usize,
    /// Available capital; 0 means unconstrained.
    pub bankroll: f64,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        let sim = SimParams::default();
        Self {
            threshold: DEFAULT_THRESHOLD,
            start_bet: sim.start_bet,
            escalation_pct: sim.escalation_pct,
            win_multiplier: None,
            bet_count_cap: None,
            default_bet_count: sim.bet_count_cap,
            bankroll: sim.bankroll,
        }
    }
}

impl AnalyticsParams {
    /// Effective payout multiplier.
    pub fn win_multiplier(&self) -> f64 {
        self.win_multiplier.unwrap_or(self.threshold)
    }

    /// Bet count fed to the simulator given the analyzer's maximum gap.
    pub fn resolve_bet_count(&self, max_gap: usize) -> usize {
        match self.bet_count_cap {
            Some(explicit) => explicit,
            None if max_gap > 0 => max_gap,
            None => self.default_bet_count,
        }
    }

    fn sim_params(&self, bet_count_cap: usize) -> SimParams {
        SimParams {
            start_bet: self.start_bet,
            escalation_pct: self.escalation_pct,
            win_multiplier: self.win_multiplier(),
            bet_count_cap,
            bankroll: self.bankroll,
        }
    }
}

/// Caller-supplied parameter changes, each applied over a base set
/// (the configured defaults). Absent fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamOverrides {
    pub threshold: Option<f64>,
    pub start_bet: Option<f64>,
    pub escalation_pct: Option<f64>,
    pub win_multiplier: Option<f64>,
    pub bet_count_cap: Option<usize>,
    pub default_bet_count: Option<usize>,
    pub bankroll: Option<f64>,
}

impl ParamOverrides {
    pub fn apply(&self, base: &AnalyticsParams) -> AnalyticsParams {
        AnalyticsParams {
            threshold: self.threshold.unwrap_or(base.threshold),
            start_bet: self.start_bet.unwrap_or(base.start_bet),
            escalation_pct: self.escalation_pct.unwrap_or(base.escalation_pct),
            win_multiplier: self.win_multiplier.or(base.win_multiplier),
            bet_count_cap: self.bet_count_cap.or(base.bet_count_cap),
            default_bet_count: self.default_bet_count.unwrap_or(base.default_bet_count),
            bankroll: self.bankroll.unwrap_or(base.bankroll),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run the classifier, the simulator and the replay over `records`.
pub fn run_analytics(records: &[CrashRecord], params: &AnalyticsParams) -> AnalyticsResult {
    let analysis = analyze(records, params.threshold);
    let bet_count_cap = params.resolve_bet_count(analysis.max_gap);
    let simulation = simulate(&params.sim_params(bet_count_cap));
    let projected_profit_loss = replay(&simulation, analysis.records.iter().map(|r| r.is_win));

    debug!(
        records = analysis.total_records,
        max_gap = analysis.max_gap,
        bet_count_cap,
        effective_length = simulation.effective_length,
        projected_profit_loss,
        "Analytics run complete"
    );

    AnalyticsResult {
        analysis,
        simulation,
        bet_count_cap,
        bankroll: params.bankroll,
        projected_profit_loss,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
