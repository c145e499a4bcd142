// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per macrobatch to checkpoints/metrics.csv.
//
// Example CSV output:
//   epoch,macrobatch,total_macrobatches,fit_ms,loss
//   1,1,412,8231,6.912044
//   1,2,412,8190,6.530118
//   ...
//
// How to read the metrics:
//   - loss should trend down within an epoch and across epochs
//   - fit_ms is wall time spent in fit steps only, without the
//     checkpoint or self-test that may follow a macrobatch
//
// The file is appended to across runs, so a resumed run simply
// continues the same curve.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::ml::scheduler::MacrobatchReport;

const HEADER: &str = "epoch,macrobatch,total_macrobatches,fit_ms,loss";

/// One row of the metrics CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacrobatchMetrics {
    pub epoch:              usize,
    pub macrobatch:         usize,
    pub total_macrobatches: usize,
    pub fit_ms:             u128,
    /// Mean minibatch loss
    pub loss:               f64,
}

impl From<&MacrobatchReport> for MacrobatchMetrics {
    fn from(r: &MacrobatchReport) -> Self {
        Self {
            epoch:              r.epoch,
            macrobatch:         r.batch,
            total_macrobatches: r.total,
            fit_ms:             r.fit_time.as_millis(),
            loss:               r.loss,
        }
    }
}

impl MacrobatchMetrics {
    fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{:.6}",
            self.epoch, self.macrobatch, self.total_macrobatches, self.fit_ms, self.loss
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &MacrobatchMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{}", m.to_csv_row())?;
        tracing::debug!(
            "Logged macrobatch {}/{} of epoch {}: loss={:.4}",
            m.macrobatch,
            m.total_macrobatches,
            m.epoch,
            m.loss,
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_row_from_report() {
        let report = MacrobatchReport {
            epoch:    2,
            batch:    5,
            total:    9,
            fit_time: Duration::from_millis(1250),
            loss:     3.5,
        };
        let m = MacrobatchMetrics::from(&report);
        assert_eq!(m.to_csv_row(), "2,5,9,1250,3.500000");
    }

    #[test]
    fn test_appends_after_single_header() {
        let dir = std::env::temp_dir().join(format!("seq2seq-metrics-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let m = MacrobatchMetrics { epoch: 1, macrobatch: 1, total_macrobatches: 2, fit_ms: 10, loss: 1.0 };
        MetricsLogger::new(&dir).unwrap().log(&m).unwrap();
        // A second logger on the same directory keeps the existing file
        MetricsLogger::new(&dir).unwrap().log(&m).unwrap();

        let text  = fs::read_to_string(dir.join("metrics.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![HEADER, "1,1,2,10,1.000000", "1,1,2,10,1.000000"]);
        let _ = fs::remove_dir_all(&dir);
    }
}
