// crates/core/src/watcher.rs
//! Rule engine that watches the measurement stream and produces advisory
//! notices.
//!
//! Rules are evaluated in a fixed order and every rule that fires appends a
//! candidate. The notice returned is built from the *last* candidate, so a
//! later rule overrides an earlier one regardless of severity. Whether "most
//! severe wins" was ever intended is unresolved; the ordering below is the
//! observable behavior dashboards rely on.

use std::collections::VecDeque;

use serde::Serialize;

use crate::types::{AdvisoryNotice, Generation, MeasurementRecord, Severity};

/// Maximum number of records kept in the history window.
pub const HISTORY_CAPACITY: usize = 20;

const STAGNATION_WINDOW: usize = 5;
const STAGNATION_RANGE: f64 = 0.1;
const UNDERPERFORMANCE_EPOCH: u32 = 10;
const UNDERPERFORMANCE_ACCURACY: f64 = 0.8;

const PLATEAU_RANGE: f64 = 0.01;
const HIGH_FINAL_LOSS: f64 = 0.4;

pub const TIP_LOSS_RECOVERING: &str = "Loss is decreasing steadily. Keep current settings consistent.";
pub const TIP_ACCURACY_STAGNATION: &str = "Accuracy has stagnated. Try changing optimizer or model capacity.";
pub const TIP_LOSS_INCREASING: &str =
    "Loss has been consistently increasing. Consider reducing the learning rate.";
pub const TIP_UNDERPERFORMING: &str =
    "Model is underperforming. You may need better features or more training data.";

/// Bounded FIFO of the most recent records for one generation.
#[derive(Debug, Default)]
pub struct HistoryWindow {
    records: VecDeque<MeasurementRecord>,
}

impl HistoryWindow {
    pub fn new() -> Self {
        Self {
            records: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn push(&mut self, record: MeasurementRecord) {
        if self.records.len() == HISTORY_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn latest(&self) -> Option<&MeasurementRecord> {
        self.records.back()
    }

    /// The last `n` records oldest-first, or `None` if fewer are held.
    pub fn last(&self, n: usize) -> Option<impl Iterator<Item = &MeasurementRecord>> {
        (self.records.len() >= n).then(|| self.records.iter().skip(self.records.len() - n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeasurementRecord> {
        self.records.iter()
    }
}

/// Point-in-time view of the current run, used by the agent summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSummary {
    pub generation: Option<Generation>,
    pub latest: Option<MeasurementRecord>,
    pub status: String,
    pub observed: u64,
}

/// Stateful rule engine over the history window.
#[derive(Debug, Default)]
pub struct EventWatcher {
    generation: Option<Generation>,
    history: HistoryWindow,
    observed: u64,
}

impl EventWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation whose records currently fill the window.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    /// Switch to a new generation, discarding history from the previous one.
    ///
    /// A no-op when `generation` is already current.
    pub fn begin_generation(&mut self, generation: Generation) {
        if self.generation == Some(generation) {
            return;
        }
        tracing::debug!(
            previous = ?self.generation,
            generation = %generation,
            dropped = self.history.len(),
            "Watcher history reset for new generation"
        );
        self.generation = Some(generation);
        self.history.clear();
        self.observed = 0;
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    /// Record a measurement and evaluate the rules against the window.
    pub fn observe(&mut self, record: &MeasurementRecord) -> Option<AdvisoryNotice> {
        self.history.push(record.clone());
        self.observed += 1;

        let mut candidates: Vec<(Severity, &'static str)> = Vec::new();

        if self.loss_recovering() {
            candidates.push((Severity::Info, TIP_LOSS_RECOVERING));
        }
        if self.accuracy_stagnating() {
            candidates.push((Severity::Info, TIP_ACCURACY_STAGNATION));
        }
        if self.loss_increasing() {
            candidates.push((Severity::Warning, TIP_LOSS_INCREASING));
        }
        if record.epoch > UNDERPERFORMANCE_EPOCH && record.accuracy < UNDERPERFORMANCE_ACCURACY {
            candidates.push((Severity::Critical, TIP_UNDERPERFORMING));
        }

        let (severity, content) = candidates.last().copied()?;
        tracing::debug!(
            epoch = record.epoch,
            severity = %severity,
            fired = candidates.len(),
            "Watcher produced advisory"
        );
        Some(AdvisoryNotice::new(severity, content))
    }

    /// Summarize the current generation's progress.
    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            generation: self.generation,
            latest: self.history.latest().cloned(),
            status: self.analyze().to_string(),
            observed: self.observed,
        }
    }

    fn analyze(&self) -> &'static str {
        let Some(recent) = self.history.last(STAGNATION_WINDOW) else {
            return "Not enough data to evaluate training yet.";
        };
        let recent: Vec<&MeasurementRecord> = recent.collect();
        let losses: Vec<f64> = recent.iter().map(|m| m.loss).collect();
        let accuracies: Vec<f64> = recent.iter().map(|m| m.accuracy).collect();

        if range(&losses) < PLATEAU_RANGE {
            return "Loss has plateaued. You may want to restart training or lower learning rate.";
        }
        if range(&accuracies) < PLATEAU_RANGE {
            return "Accuracy hasn't improved recently. Consider reviewing your data or model.";
        }
        if losses.last().is_some_and(|l| *l > HIGH_FINAL_LOSS) {
            return "Final loss is still high. Try more training epochs or a smaller learning rate.";
        }
        "Training progressing normally."
    }

    fn recent_losses(&self, n: usize) -> Option<Vec<f64>> {
        self.history.last(n).map(|it| it.map(|m| m.loss).collect())
    }

    fn loss_recovering(&self) -> bool {
        self.recent_losses(3)
            .is_some_and(|l| l[2] < l[1] && l[1] < l[0])
    }

    fn loss_increasing(&self) -> bool {
        // Needs four records of history; the oldest of the four is not compared.
        self.recent_losses(4)
            .is_some_and(|l| l[3] > l[2] && l[2] > l[1])
    }

    fn accuracy_stagnating(&self) -> bool {
        self.history
            .last(STAGNATION_WINDOW)
            .map(|it| it.map(|m| m.accuracy).collect::<Vec<_>>())
            .is_some_and(|acc| range(&acc) < STAGNATION_RANGE)
    }
}

fn range(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(epoch: u32, loss: f64, accuracy: f64) -> MeasurementRecord {
        MeasurementRecord::new(epoch, loss, accuracy)
    }

    fn watcher() -> EventWatcher {
        let mut w = EventWatcher::new();
        w.begin_generation(Generation(1));
        w
    }

    #[test]
    fn test_window_is_bounded_and_fifo() {
        let mut w = watcher();
        for epoch in 1..=25 {
            w.observe(&record(epoch, 0.5, 0.5));
            assert!(w.history().len() <= HISTORY_CAPACITY);
        }
        assert_eq!(w.history().len(), HISTORY_CAPACITY);
        let epochs: Vec<u32> = w.history().iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, (6..=25).collect::<Vec<_>>());
    }

    #[test]
    fn test_increasing_loss_warns() {
        let mut w = watcher();
        let losses = [0.30, 0.32, 0.35, 0.40];
        let mut last = None;
        for (i, loss) in losses.iter().enumerate() {
            last = w.observe(&record(i as u32 + 1, *loss, 0.2 + i as f64 * 0.2));
        }
        let notice = last.expect("warning expected");
        assert_eq!(notice.severity, Severity::Warning);
        assert_eq!(notice.content, TIP_LOSS_INCREASING);
    }

    #[test]
    fn test_increasing_loss_needs_four_records() {
        let mut w = watcher();
        assert!(w.observe(&record(1, 0.30, 0.1)).is_none());
        assert!(w.observe(&record(2, 0.32, 0.3)).is_none());
        assert!(w.observe(&record(3, 0.35, 0.5)).is_none());
    }

    #[test]
    fn test_underperformance_is_critical() {
        let mut w = watcher();
        let notice = w.observe(&record(15, 0.3, 0.6)).expect("critical expected");
        assert_eq!(notice.severity, Severity::Critical);
        assert_eq!(notice.content, TIP_UNDERPERFORMING);
    }

    #[test]
    fn test_underperformance_overrides_earlier_rules() {
        let mut w = watcher();
        // Losses strictly decreasing: loss-recovering also fires.
        w.observe(&record(11, 0.5, 0.1));
        w.observe(&record(12, 0.4, 0.3));
        let notice = w.observe(&record(13, 0.3, 0.5)).unwrap();
        assert_eq!(notice.severity, Severity::Critical);
    }

    #[test]
    fn test_last_match_wins_over_severity() {
        let mut w = watcher();
        // Stagnating accuracy (info) and rising loss (warning) fire together;
        // rising loss is evaluated later and wins.
        let rows = [(1, 0.9, 0.50), (2, 0.2, 0.51), (3, 0.3, 0.52), (4, 0.4, 0.53), (5, 0.5, 0.54)];
        let mut last = None;
        for (epoch, loss, acc) in rows {
            last = w.observe(&record(epoch, loss, acc));
        }
        assert_eq!(last.unwrap().content, TIP_LOSS_INCREASING);
    }

    #[test]
    fn test_stagnation_is_info_when_alone() {
        let mut w = watcher();
        let mut last = None;
        for epoch in 1..=5 {
            last = w.observe(&record(epoch, 0.4, 0.5 + epoch as f64 * 0.01));
        }
        let notice = last.unwrap();
        assert_eq!(notice.severity, Severity::Info);
        assert_eq!(notice.content, TIP_ACCURACY_STAGNATION);
    }

    #[test]
    fn test_recovering_loss_is_info() {
        let mut w = watcher();
        w.observe(&record(1, 0.5, 0.1));
        w.observe(&record(2, 0.4, 0.4));
        let notice = w.observe(&record(3, 0.3, 0.8)).unwrap();
        assert_eq!(notice.severity, Severity::Info);
        assert_eq!(notice.content, TIP_LOSS_RECOVERING);
    }

    #[test]
    fn test_new_generation_resets_history() {
        let mut w = watcher();
        w.observe(&record(1, 0.30, 0.1));
        w.observe(&record(2, 0.32, 0.3));
        w.observe(&record(3, 0.35, 0.5));

        w.begin_generation(Generation(2));
        assert!(w.history().is_empty());
        // Without the reset this would complete a rising-loss streak.
        assert!(w.observe(&record(1, 0.40, 0.7)).is_none());
        assert_eq!(w.summary().observed, 1);
    }

    #[test]
    fn test_begin_same_generation_keeps_history() {
        let mut w = watcher();
        w.observe(&record(1, 0.3, 0.1));
        w.begin_generation(Generation(1));
        assert_eq!(w.history().len(), 1);
    }

    #[test]
    fn test_summary_statuses() {
        let mut w = watcher();
        assert_eq!(w.summary().status, "Not enough data to evaluate training yet.");

        for epoch in 1..=5 {
            w.observe(&record(epoch, 0.3, 0.1 * epoch as f64));
        }
        assert!(w.summary().status.starts_with("Loss has plateaued"));

        let mut w = watcher();
        for epoch in 1..=5 {
            w.observe(&record(epoch, 1.0 - 0.1 * epoch as f64, 0.1 * epoch as f64));
        }
        let summary = w.summary();
        assert!(summary.status.starts_with("Final loss is still high"));
        assert_eq!(summary.latest.unwrap().epoch, 5);
        assert_eq!(summary.generation, Some(Generation(1)));
    }
}
