//! Shared types for the crash analytics engine.
//!
//! These types form the data model used across all modules: the raw
//! outcome records delivered by the history fetcher, the derived
//! classification / streak / ledger data produced by the engine, and the
//! error enum used at the I/O boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Outcome records
// ---------------------------------------------------------------------------

/// Provably-fair hash attached to each crash round. Carried through
/// unchanged; the engine never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoundHash {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(rename = "__typename", default)]
    pub type_tag: String,
}

/// One row of crash history, in the shape returned by the Stake
/// `crashGameList` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashRecord {
    /// Multiplier at which the round ended.
    pub crashpoint: f64,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub hash: RoundHash,
    #[serde(rename = "__typename", default)]
    pub type_tag: String,
}

impl CrashRecord {
    /// Build a record carrying only a crash point (tests, synthetic data).
    pub fn from_crashpoint(crashpoint: f64) -> Self {
        Self {
            crashpoint,
            id: String::new(),
            start_time: String::new(),
            hash: RoundHash::default(),
            type_tag: "MultiplayerCrash".to_string(),
        }
    }

    /// Whether this round counts as a win at the given threshold.
    pub fn is_win(&self, threshold: f64) -> bool {
        self.crashpoint >= threshold
    }
}

impl fmt::Display for CrashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.crashpoint)?;
        if !self.id.is_empty() {
            write!(f, " [{}]", self.id)?;
        }
        Ok(())
    }
}

/// The Stake API lists rounds newest first. Reverse into chronological
/// (most-recent-last) order.
pub fn into_chronological(mut records: Vec<CrashRecord>) -> Vec<CrashRecord> {
    records.reverse();
    records
}

/// A record together with its derived classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: CrashRecord,
    pub is_win: bool,
    /// Records since the previous win (wins only).
    pub gap: Option<usize>,
    /// `gap` with its ordinal suffix, e.g. "3rd" (wins only).
    pub gap_label: Option<String>,
}

// ---------------------------------------------------------------------------
// Streaks
// ---------------------------------------------------------------------------

/// Streak length → number of times a maximal run of that length occurred.
///
/// Backed by a `BTreeMap` so iteration and serialization are ordered by
/// length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StreakTable(BTreeMap<usize, usize>);

impl StreakTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more run of `length`. Zero-length runs are ignored.
    pub fn record(&mut self, length: usize) {
        if length > 0 {
            *self.0.entry(length).or_insert(0) += 1;
        }
    }

    /// Occurrences of runs with exactly this length.
    pub fn count(&self, length: usize) -> usize {
        self.0.get(&length).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct run lengths observed.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Longest run observed (0 if none).
    pub fn longest(&self) -> usize {
        self.0.keys().next_back().copied().unwrap_or(0)
    }

    /// Total records covered by all runs: Σ length × count.
    pub fn total_records(&self) -> usize {
        self.0.iter().map(|(len, count)| len * count).sum()
    }

    /// Total number of runs.
    pub fn total_runs(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(l, c)| (*l, *c))
    }
}

impl fmt::Display for StreakTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "none");
        }
        let parts: Vec<String> = self.iter().map(|(l, c)| format!("{l}x{c}")).collect();
        write!(f, "{}", parts.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Analysis output
// ---------------------------------------------------------------------------

/// Output of the classifier / streak analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    pub threshold: f64,
    pub records: Vec<ClassifiedRecord>,
    pub total_records: usize,
    pub total_wins: usize,
    pub total_losses: usize,
    pub wins_after_win: usize,
    pub wins_after_loss: usize,
    pub loss_streaks: StreakTable,
    pub win_streaks: StreakTable,
    /// Largest gap between consecutive wins. Used as the "maximum losing
    /// streak" for bet-count auto-tuning.
    pub max_gap: usize,
}

impl AnalysisResult {
    /// Win flags in record order.
    pub fn flags(&self) -> Vec<bool> {
        self.records.iter().map(|r| r.is_win).collect()
    }

    /// Win rate as a fraction (0.0 for an empty sequence).
    pub fn win_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.total_wins as f64 / self.total_records as f64
        }
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records={} | wins={} ({:.1}%) | after win={} | after loss={} | max gap={} | loss streaks: {} | win streaks: {}",
            self.total_records,
            self.total_wins,
            self.win_rate() * 100.0,
            self.wins_after_win,
            self.wins_after_loss,
            self.max_gap,
            self.loss_streaks,
            self.win_streaks,
        )
    }
}

// ---------------------------------------------------------------------------
// Simulation output
// ---------------------------------------------------------------------------

/// One simulated bet. All money values are rounded to 2 dp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// 1-based position in the bet cycle.
    pub bet_number: usize,
    pub bet_amount: f64,
    pub profit_if_won: f64,
    /// Total staked so far, including this bet.
    pub cumulative_cost: f64,
    /// Net result if this bet wins after all previous ones lost.
    pub profit_loss_if_won: f64,
}

impl fmt::Display for LedgerRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<3} bet={:>10.2} win={:>10.2} cost={:>10.2} net={:>10.2}",
            self.bet_number,
            self.bet_amount,
            self.profit_if_won,
            self.cumulative_cost,
            self.profit_loss_if_won,
        )
    }
}

/// Output of the bet simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimResult {
    /// False when the inputs could not describe a simulation (non-positive
    /// start bet, multiplier or bet count). Distinguishes "invalid" from a
    /// legitimately empty ledger caused by a tiny bankroll.
    pub valid: bool,
    pub win_multiplier: f64,
    pub ledger: Vec<LedgerRow>,
    /// Number of bets affordable under the bankroll.
    pub effective_length: usize,
    /// Capital needed to fund every bet up to the bet-count cap.
    pub bankroll_needed: f64,
    /// Set when the requested bet count exceeded the hard iteration cap.
    pub iteration_capped: bool,
}

impl SimResult {
    /// The empty result returned for degenerate inputs.
    pub fn invalid() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Combined output
// ---------------------------------------------------------------------------

/// The orchestrator's merged result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub analysis: AnalysisResult,
    pub simulation: SimResult,
    /// Bet-count cap actually fed to the simulator.
    pub bet_count_cap: usize,
    pub bankroll: f64,
    /// Cumulative profit/loss from replaying the ledger over the history.
    pub projected_profit_loss: f64,
}

impl AnalyticsResult {
    /// Extra capital required to cover the full bet cycle (0 if covered).
    pub fn shortfall(&self) -> f64 {
        (self.simulation.bankroll_needed - self.bankroll).max(0.0)
    }
}

impl fmt::Display for AnalyticsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sim = &self.simulation;
        if sim.effective_length > 0 {
            writeln!(
                f,
                "A bankroll of {:.2} can sustain a maximum of {} bets.",
                self.bankroll, sim.effective_length
            )?;
            if self.analysis.max_gap > 0 {
                writeln!(
                    f,
                    "Longest historical losing streak: {} bets.",
                    self.analysis.max_gap
                )?;
                writeln!(
                    f,
                    "Bankroll needed to cover {} bets: {:.2}.",
                    self.bet_count_cap, sim.bankroll_needed
                )?;
                if self.bankroll >= sim.bankroll_needed {
                    writeln!(f, "Current bankroll covers the full streak.")?;
                } else {
                    writeln!(f, "Additional {:.2} needed to cover the full streak.", self.shortfall())?;
                }
            }
        }
        if self.analysis.total_records > 0 {
            writeln!(f, "{}", self.analysis)?;
            write!(f, "Projected profit/loss over history: {:.2}", self.projected_profit_loss)?;
        } else {
            write!(f, "No history loaded.")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Boundary errors
// ---------------------------------------------------------------------------

/// Request headers replayed against the history API.
pub type HeaderBlob = BTreeMap<String, String>;

/// Failures at the I/O boundary (history fetch, credential store).
///
/// The analytics engine itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Bad caller input or key configuration.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Local persistence failure, including stored data that no longer
    /// decrypts or parses.
    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
