//! Martingale-style bet simulator.
//!
//! Builds a ledger of geometrically escalating bets bounded by a bankroll,
//! and replays that ledger over a classified history to project profit or
//! loss. Every money value is rounded to 2 dp where it is stored, exactly
//! like the numbers a user sees in the ledger table.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{LedgerRow, SimResult};

/// Hard cap on simulated bets, guarding against pathological parameters
/// (tiny escalation with a huge bet count).
pub const MAX_SIMULATED_BETS: usize = 1000;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Bet sizing inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    /// First bet of every cycle.
    pub start_bet: f64,
    /// Percentage added to the bet after each round (100 = doubling).
    pub escalation_pct: f64,
    /// Payout multiplier on a winning bet.
    pub win_multiplier: f64,
    /// Number of bets in a full cycle.
    pub bet_count_cap: usize,
    /// Available capital. 0 means unconstrained.
    pub bankroll: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            start_bet: 1.0,
            escalation_pct: 90.0,
            win_multiplier: 2.0,
            bet_count_cap: 20,
            bankroll: 1000.0,
        }
    }
}

impl SimParams {
    /// Whether these inputs describe a runnable simulation. NaN fails too.
    pub fn is_valid(&self) -> bool {
        self.start_bet > 0.0 && self.win_multiplier > 0.0 && self.bet_count_cap > 0
    }
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to 2 dp, half away from zero, on the exact binary value of
/// `value` (so 1.005 rounds down, as it is stored as 1.00499...).
///
/// Non-finite and out-of-range values are returned unchanged.
pub fn round_money(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_string().parse::<f64>().ok())
        .unwrap_or(value)
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Next bet in the geometric progression.
fn escalate(bet: f64, escalation_pct: f64) -> f64 {
    bet + bet * (escalation_pct / 100.0)
}

/// Build the bet ledger.
///
/// Returns [`SimResult::invalid`] when the start bet, multiplier or bet
/// count is not positive. Otherwise the ledger holds one row per bet until
/// either the bet count is reached or the next bet would push cumulative
/// cost past a positive bankroll.
pub fn simulate(params: &SimParams) -> SimResult {
    if !params.is_valid() {
        debug!(?params, "Simulation inputs invalid");
        return SimResult::invalid();
    }

    let iteration_capped = params.bet_count_cap > MAX_SIMULATED_BETS;
    let bet_count = params.bet_count_cap.min(MAX_SIMULATED_BETS);
    let constrained = params.bankroll > 0.0;

    let mut ledger = Vec::with_capacity(bet_count);
    let mut bet = params.start_bet;
    let mut cumulative_cost = 0.0;
    let mut effective_length = 0;

    for bet_number in 1..=bet_count {
        let tentative = cumulative_cost + bet;
        if constrained && tentative > params.bankroll {
            break;
        }
        cumulative_cost = tentative;

        let profit_if_won = bet * params.win_multiplier;
        ledger.push(LedgerRow {
            bet_number,
            bet_amount: round_money(bet),
            profit_if_won: round_money(profit_if_won),
            cumulative_cost: round_money(cumulative_cost),
            profit_loss_if_won: round_money(profit_if_won - cumulative_cost),
        });
        effective_length = bet_number;

        bet = escalate(bet, params.escalation_pct);
    }

    let bankroll_needed = round_money(full_cycle_cost(params));

    debug!(
        effective_length,
        bet_count,
        bankroll_needed,
        iteration_capped,
        "Simulation complete"
    );

    SimResult {
        valid: true,
        win_multiplier: params.win_multiplier,
        ledger,
        effective_length,
        bankroll_needed,
        iteration_capped,
    }
}

/// Sum of the first `bet_count_cap` bets, ignoring the bankroll.
///
/// Counts past [`MAX_SIMULATED_BETS`] use the closed-form geometric sum so
/// the figure still covers the whole requested cycle.
fn full_cycle_cost(params: &SimParams) -> f64 {
    let n = params.bet_count_cap;
    if n > MAX_SIMULATED_BETS {
        let rate = params.escalation_pct / 100.0;
        if rate == 0.0 {
            return params.start_bet * n as f64;
        }
        return params.start_bet * ((1.0 + rate).powf(n as f64) - 1.0) / rate;
    }

    let mut bet = params.start_bet;
    let mut total = 0.0;
    for _ in 0..n {
        total += bet;
        bet = escalate(bet, params.escalation_pct);
    }
    total
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Replay the ledger over a sequence of win/loss outcomes and return the
/// cumulative profit/loss (rounded to 2 dp).
///
/// A win pays `bet × multiplier − bet` and restarts the cycle at the first
/// bet; a loss costs the bet and moves one row down the ledger. Once the
/// cursor runs past the affordable rows the strategy is considered busted:
/// later outcomes, wins included, change nothing and the cycle is never
/// restarted.
pub fn replay<I>(sim: &SimResult, outcomes: I) -> f64
where
    I: IntoIterator<Item = bool>,
{
    let mut total = 0.0;
    let mut cursor = 0usize;

    for is_win in outcomes {
        if cursor >= sim.effective_length {
            continue;
        }
        let Some(row) = sim.ledger.get(cursor) else {
            continue;
        };
        if is_win {
            total += row.bet_amount * sim.win_multiplier - row.bet_amount;
            cursor = 0;
        } else {
            total -= row.bet_amount;
            cursor += 1;
        }
    }

    round_money(total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
