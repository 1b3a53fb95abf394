//! Report module: aggregates repeated runs and prints per-backend latency.

use std::time::Duration;

use crate::runner::{BenchmarkResult, Operation};
use crate::store::BackendKind;

/// Latency samples for one backend across rounds.
#[derive(Debug, Clone)]
pub struct BackendSeries {
    pub backend: BackendKind,
    pub samples: Vec<Duration>,
    pub wins: usize,
}

impl BackendSeries {
    fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            samples: Vec::new(),
            wins: 0,
        }
    }

    pub fn mean_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|d| d.as_secs_f64() * 1e3).sum();
        sum / self.samples.len() as f64
    }

    /// Nearest-rank percentile in milliseconds.
    pub fn percentile_ms(&self, pct: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self
            .samples
            .iter()
            .map(|d| d.as_secs_f64() * 1e3)
            .collect();
        sorted.sort_by(f64::total_cmp);
        let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

/// Every round of one operation with one batch size.
#[derive(Debug, Clone)]
pub struct RoundSummary {
    pub operation: Operation,
    pub count: usize,
    pub a: BackendSeries,
    pub b: BackendSeries,
}

impl RoundSummary {
    pub fn new(operation: Operation, count: usize, a: BackendKind, b: BackendKind) -> Self {
        Self {
            operation,
            count,
            a: BackendSeries::new(a),
            b: BackendSeries::new(b),
        }
    }

    pub fn add(&mut self, result: &BenchmarkResult) {
        self.a.samples.push(result.raw_a);
        self.b.samples.push(result.raw_b);
        if result.winner == self.a.backend {
            self.a.wins += 1;
        } else {
            self.b.wins += 1;
        }
    }

    pub fn rounds(&self) -> usize {
        self.a.samples.len()
    }

    /// Backend with more round wins; ties go to A, as for single runs.
    pub fn overall_winner(&self) -> BackendKind {
        if self.b.wins > self.a.wins {
            self.b.backend
        } else {
            self.a.backend
        }
    }
}

pub fn print_report(summary: &RoundSummary) {
    println!("\n{}", "=".repeat(72));
    println!(
        "  {} | batch size {} | {} round(s)",
        summary.operation.label(),
        summary.count,
        summary.rounds()
    );
    println!("{}", "=".repeat(72));
    println!(
        "  {:10} {:>12} {:>12} {:>12} {:>8}",
        "Backend", "Mean (ms)", "p50 (ms)", "p95 (ms)", "Wins"
    );
    println!("  {}", "-".repeat(58));

    for series in [&summary.a, &summary.b] {
        println!(
            "  {:10} {:>12.3} {:>12.3} {:>12.3} {:>8}",
            series.backend.label(),
            series.mean_ms(),
            series.percentile_ms(50.0),
            series.percentile_ms(95.0),
            series.wins
        );
    }

    println!("\n  Winner: {}", summary.overall_winner());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(a_ms: u64, b_ms: u64) -> BenchmarkResult {
        BenchmarkResult::from_timings(
            Operation::Insert,
            10,
            (BackendKind::Relational, Duration::from_millis(a_ms)),
            (BackendKind::Document, Duration::from_millis(b_ms)),
        )
    }

    #[test]
    fn summary_counts_wins_per_backend() {
        let mut summary = RoundSummary::new(
            Operation::Insert,
            10,
            BackendKind::Relational,
            BackendKind::Document,
        );
        summary.add(&result(5, 3));
        summary.add(&result(2, 4));
        summary.add(&result(6, 1));

        assert_eq!(summary.rounds(), 3);
        assert_eq!(summary.a.wins, 1);
        assert_eq!(summary.b.wins, 2);
        assert_eq!(summary.overall_winner(), BackendKind::Document);
    }

    #[test]
    fn even_wins_go_to_backend_a() {
        let mut summary = RoundSummary::new(
            Operation::Read,
            1,
            BackendKind::Relational,
            BackendKind::Document,
        );
        summary.add(&result(5, 3));
        summary.add(&result(2, 4));
        assert_eq!(summary.overall_winner(), BackendKind::Relational);
    }

    #[test]
    fn mean_and_percentiles() {
        let mut series = BackendSeries::new(BackendKind::Relational);
        assert_eq!(series.mean_ms(), 0.0);
        assert_eq!(series.percentile_ms(95.0), 0.0);

        series.samples = (1..=10).map(Duration::from_millis).collect();
        assert!((series.mean_ms() - 5.5).abs() < 1e-9);
        assert!((series.percentile_ms(50.0) - 6.0).abs() < 1e-9);
        assert!((series.percentile_ms(95.0) - 10.0).abs() < 1e-9);
        assert!((series.percentile_ms(0.0) - 1.0).abs() < 1e-9);
    }
}
