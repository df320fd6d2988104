//! Outcome classification, streak tables and win gaps.
//!
//! A single left-to-right pass classifies every record against the
//! threshold and accumulates all statistics. The pass state lives in
//! [`StreakFold`], threaded through `Iterator::fold`, so repeated calls
//! share nothing.

use tracing::debug;

use crate::types::{AnalysisResult, ClassifiedRecord, CrashRecord, StreakTable};

/// Default win threshold (2.0x).
pub const DEFAULT_THRESHOLD: f64 = 2.0;

// ---------------------------------------------------------------------------
// Ordinals
// ---------------------------------------------------------------------------

/// English ordinal suffix: 1 → "st", 2 → "nd", 3 → "rd", 11-13 → "th".
pub fn ordinal_suffix(n: usize) -> &'static str {
    if (11..=13).contains(&(n % 100)) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// `n` followed by its ordinal suffix, e.g. `ordinal(22) == "22nd"`.
pub fn ordinal(n: usize) -> String {
    format!("{n}{}", ordinal_suffix(n))
}

// ---------------------------------------------------------------------------
// Fold state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StreakFold {
    classified: Vec<ClassifiedRecord>,
    last_win_index: Option<usize>,
    prev_was_win: bool,
    loss_run: usize,
    win_run: usize,
    total_wins: usize,
    wins_after_win: usize,
    wins_after_loss: usize,
    max_gap: usize,
    loss_streaks: StreakTable,
    win_streaks: StreakTable,
}

impl StreakFold {
    fn with_capacity(n: usize) -> Self {
        Self {
            classified: Vec::with_capacity(n),
            ..Self::default()
        }
    }

    fn step(mut self, index: usize, record: &CrashRecord, threshold: f64) -> Self {
        let is_win = record.is_win(threshold);

        let (gap, gap_label) = if is_win {
            self.loss_streaks.record(self.loss_run);
            self.loss_run = 0;
            self.win_run += 1;
            self.total_wins += 1;

            // Only the immediately preceding record decides; the first
            // record has nothing before it and counts as "after loss".
            if index > 0 && self.prev_was_win {
                self.wins_after_win += 1;
            } else {
                self.wins_after_loss += 1;
            }

            let gap = match self.last_win_index {
                Some(last) => index - last,
                None => index + 1,
            };
            self.max_gap = self.max_gap.max(gap);
            self.last_win_index = Some(index);
            (Some(gap), Some(ordinal(gap)))
        } else {
            self.win_streaks.record(self.win_run);
            self.win_run = 0;
            self.loss_run += 1;
            (None, None)
        };

        self.prev_was_win = is_win;
        self.classified.push(ClassifiedRecord {
            record: record.clone(),
            is_win,
            gap,
            gap_label,
        });
        self
    }

    fn finish(mut self, threshold: f64) -> AnalysisResult {
        // Runs that reach the end of the sequence still count.
        self.loss_streaks.record(self.loss_run);
        self.win_streaks.record(self.win_run);

        let total_records = self.classified.len();
        AnalysisResult {
            threshold,
            records: self.classified,
            total_records,
            total_wins: self.total_wins,
            total_losses: total_records - self.total_wins,
            wins_after_win: self.wins_after_win,
            wins_after_loss: self.wins_after_loss,
            loss_streaks: self.loss_streaks,
            win_streaks: self.win_streaks,
            max_gap: self.max_gap,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Classify every record against `threshold` and derive streak and gap
/// statistics.
///
/// Total over its input: an empty slice yields zero counts and empty
/// tables; a threshold at or below zero makes every record a win.
pub fn analyze(records: &[CrashRecord], threshold: f64) -> AnalysisResult {
    let result = records
        .iter()
        .enumerate()
        .fold(StreakFold::with_capacity(records.len()), |state, (i, r)| {
            state.step(i, r, threshold)
        })
        .finish(threshold);

    debug!(
        records = result.total_records,
        wins = result.total_wins,
        max_gap = result.max_gap,
        threshold,
        "History analyzed"
    );

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn history(points: &[f64]) -> Vec<CrashRecord> {
        points.iter().copied().map(CrashRecord::from_crashpoint).collect()
    }

    #[test]
    fn test_ordinal_suffix() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(4), "th");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(21), "st");
        assert_eq!(ordinal_suffix(102), "nd");
        assert_eq!(ordinal_suffix(111), "th");
        assert_eq!(ordinal_suffix(113), "th");
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(22), "22nd");
        assert_eq!(ordinal(13), "13th");
    }

    #[test]
    fn test_three_record_scenario() {
        let result = analyze(&history(&[1.5, 3.0, 1.2]), 2.0);
        assert_eq!(result.flags(), vec![false, true, false]);
        assert_eq!(result.loss_streaks.count(1), 2);
        assert_eq!(result.loss_streaks.len(), 1);
        assert_eq!(result.win_streaks.count(1), 1);
        assert_eq!(result.win_streaks.len(), 1);
        assert_eq!(result.max_gap, 2);
        assert_eq!(result.records[1].gap, Some(2));
        assert_eq!(result.records[1].gap_label.as_deref(), Some("2nd"));
        assert_eq!(result.records[0].gap_label, None);
    }

    #[test]
    fn test_empty_history() {
        let result = analyze(&[], 2.0);
        assert_eq!(result.total_records, 0);
        assert_eq!(result.total_wins, 0);
        assert_eq!(result.total_losses, 0);
        assert_eq!(result.wins_after_win, 0);
        assert_eq!(result.wins_after_loss, 0);
        assert_eq!(result.max_gap, 0);
        assert!(result.loss_streaks.is_empty());
        assert!(result.win_streaks.is_empty());
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_non_positive_threshold_all_wins() {
        let result = analyze(&history(&[1.0, 1.01, 5.0]), 0.0);
        assert_eq!(result.total_wins, 3);
        assert_eq!(result.win_streaks.count(3), 1);
        assert!(result.loss_streaks.is_empty());
        assert_eq!(result.max_gap, 1);

        let negative = analyze(&history(&[1.0, 1.01]), -1.0);
        assert_eq!(negative.total_wins, 2);
    }

    #[test]
    fn test_unreachable_threshold_no_wins() {
        let result = analyze(&history(&[1.0, 50.0, 3.0]), 1000.0);
        assert_eq!(result.total_wins, 0);
        assert_eq!(result.loss_streaks.count(3), 1);
        assert_eq!(result.max_gap, 0);
        assert!(result.records.iter().all(|r| r.gap.is_none()));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let result = analyze(&history(&[2.0, 1.99]), 2.0);
        assert_eq!(result.flags(), vec![true, false]);
    }

    #[test]
    fn test_first_record_win_counts_after_loss() {
        let result = analyze(&history(&[2.5, 2.5, 1.0, 2.5]), 2.0);
        assert_eq!(result.wins_after_loss, 2);
        assert_eq!(result.wins_after_win, 1);
        assert_eq!(result.records[0].gap, Some(1));
        assert_eq!(result.records[0].gap_label.as_deref(), Some("1st"));
    }

    #[test]
    fn test_win_after_win_uses_immediate_predecessor() {
        // Wins at 0 and 2 are not adjacent: the win at 2 follows a loss.
        let result = analyze(&history(&[3.0, 1.0, 3.0, 3.0]), 2.0);
        assert_eq!(result.wins_after_loss, 2);
        assert_eq!(result.wins_after_win, 1);
    }

    #[test]
    fn test_trailing_streaks_flushed() {
        let losses_at_end = analyze(&history(&[3.0, 1.0, 1.0, 1.0]), 2.0);
        assert_eq!(losses_at_end.loss_streaks.count(3), 1);
        assert_eq!(losses_at_end.win_streaks.count(1), 1);

        let wins_at_end = analyze(&history(&[1.0, 3.0, 3.0]), 2.0);
        assert_eq!(wins_at_end.win_streaks.count(2), 1);
        assert_eq!(wins_at_end.loss_streaks.count(1), 1);
    }

    #[test]
    fn test_gaps_and_max_gap() {
        // wins at 2, 3, 7
        let result = analyze(&history(&[1.0, 1.0, 4.0, 4.0, 1.0, 1.0, 1.0, 4.0]), 2.0);
        let gaps: Vec<Option<usize>> = result.records.iter().map(|r| r.gap).collect();
        assert_eq!(
            gaps,
            vec![None, None, Some(3), Some(1), None, None, None, Some(4)]
        );
        assert_eq!(result.max_gap, 4);
        assert_eq!(result.records[7].gap_label.as_deref(), Some("4th"));
    }

    #[test]
    fn test_streak_tables_sum_to_totals() {
        let points = [
            1.2, 3.4, 1.0, 1.0, 2.0, 2.1, 9.9, 1.5, 1.1, 1.3, 1.7, 4.0, 1.0, 2.2, 1.0,
        ];
        let result = analyze(&history(&points), 2.0);
        assert_eq!(result.loss_streaks.total_records(), result.total_losses);
        assert_eq!(result.win_streaks.total_records(), result.total_wins);
        assert_eq!(
            result.wins_after_win + result.wins_after_loss,
            result.total_wins
        );
        assert_eq!(result.total_wins + result.total_losses, points.len());
    }

    #[test]
    fn test_classification_depends_only_on_own_crashpoint() {
        let a = analyze(&history(&[1.0, 2.5, 3.0]), 2.0);
        let b = analyze(&history(&[9.0, 2.5, 1.0]), 2.0);
        assert_eq!(a.records[1].is_win, b.records[1].is_win);
    }

    #[test]
    fn test_repeated_analysis_is_identical() {
        let records = history(&[1.5, 3.0, 1.2, 2.0, 2.0, 1.0]);
        let first = analyze(&records, 2.0);
        let second = analyze(&records, 2.0);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_input_order_preserved() {
        let records = history(&[5.0, 1.0, 3.0]);
        let result = analyze(&records, 2.0);
        let points: Vec<f64> = result.records.iter().map(|r| r.record.crashpoint).collect();
        assert_eq!(points, vec![5.0, 1.0, 3.0]);
    }
}
