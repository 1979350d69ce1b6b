use anyhow::{Context, Result};
use ingest::{NO_ENTITY_SIGN, SkippedSequence};
use linker::{MetricsSnapshot, ResultRow};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const REPORT_MAIN_FILE: &str = "report.txt";
pub const REPORT_FULL_RESULT: &str = "result.csv";
pub const REPORT_JSON: &str = "report.json";
const REPORT_FOLDER_PREFIX: &str = "report";
const REPORT_TIME_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

const CSV_HEADER: [&str; 8] = [
    "sequence_id",
    "position",
    "token",
    "test_entity",
    "result_entity",
    "test_classified",
    "result_classified",
    "correct_predict",
];

/// 2x2 confusion matrix over tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn add(&mut self, actual: bool, predicted: bool) {
        match (actual, predicted) {
            (false, false) => self.true_negative += 1,
            (false, true) => self.false_positive += 1,
            (true, false) => self.false_negative += 1,
            (true, true) => self.true_positive += 1,
        }
    }

    /// Was the token's position detected, whatever the entity.
    pub fn detection(rows: &[ResultRow]) -> Self {
        let mut matrix = Self::default();
        for row in rows {
            matrix.add(row.ground_truth, row.predicted);
        }
        matrix
    }

    /// Positive only when the predicted entity is the ground-truth entity.
    /// A mention linked to the wrong entity counts as missed.
    pub fn exact_entity(rows: &[ResultRow]) -> Self {
        let mut matrix = Self::default();
        for row in rows {
            let predicted = if row.ground_truth {
                row.predicted && row.correct_predict
            } else {
                row.predicted
            };
            matrix.add(row.ground_truth, predicted);
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.true_negative + self.true_positive, self.total())
    }

    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// Percentage rounded to two decimals, `n/a` for an empty denominator.
pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}%", (v * 10000.0).round() / 100.0),
        None => "n/a".to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub input_file: String,
    pub method: String,
    /// Sentences read from the input, including the ones skipped.
    pub sequences_read: usize,
    pub sequences_classified: usize,
    pub skipped: Vec<SkippedSequence>,
    pub tokens: usize,
    pub detection: ConfusionMatrix,
    pub exact_entity: ConfusionMatrix,
    pub metrics: Option<MetricsSnapshot>,
}

impl ClassificationReport {
    pub fn new(
        input_file: impl Into<String>,
        method: impl Into<String>,
        sequences_classified: usize,
        skipped: Vec<SkippedSequence>,
        rows: &[ResultRow],
    ) -> Self {
        Self {
            input_file: input_file.into(),
            method: method.into(),
            sequences_read: sequences_classified + skipped.len(),
            sequences_classified,
            skipped,
            tokens: rows.len(),
            detection: ConfusionMatrix::detection(rows),
            exact_entity: ConfusionMatrix::exact_entity(rows),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Contents of `report.txt`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Classification result for file:\n{}", self.input_file);
        let _ = writeln!(out, "Classification method:\n{}", self.method);
        let _ = writeln!(out, "Classification sequences:\n{}", self.sequences_read);
        let _ = writeln!(out, "Classified: {}", self.sequences_classified);
        let _ = writeln!(out, "Skipped: {}", self.skipped.len());
        for skipped in &self.skipped {
            let _ = writeln!(out, "  sequence {}: {}", skipped.id, skipped.reason);
        }
        let _ = writeln!(out);
        render_matrix(&mut out, "Results for classification (correct position):", &self.detection);
        let _ = writeln!(out);
        render_matrix(&mut out, "Results for classification (correct position and entity):", &self.exact_entity);

        if let Some(metrics) = &self.metrics {
            let _ = writeln!(out);
            let _ = writeln!(out, "Spans: {} (accepted: {})", metrics.spans, metrics.accepted_spans);
            let _ = writeln!(out, "Candidates evaluated: {}", metrics.candidates_evaluated);
            let _ = writeln!(out, "Lookup failures: {}", metrics.lookup_failures);
            let _ = writeln!(out, "Avg time per sequence: {:.1} ms", metrics.avg_sequence_time_ms);
        }
        out
    }

    /// Write `report.txt`, `result.csv` and `report.json` into a fresh
    /// directory under `base_dir`; returns that directory.
    pub fn write(&self, base_dir: &Path, rows: &[ResultRow]) -> Result<PathBuf> {
        let dir = create_report_dir(base_dir)?;

        std::fs::write(dir.join(REPORT_MAIN_FILE), self.render())
            .context("Failed to write report.txt")?;
        let csv_file = std::fs::File::create(dir.join(REPORT_FULL_RESULT))
            .context("Failed to create result.csv")?;
        write_csv(csv_file, rows).context("Failed to write result.csv")?;

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(REPORT_JSON), json)
            .context("Failed to write report.json")?;

        Ok(dir)
    }
}

fn render_matrix(out: &mut String, title: &str, matrix: &ConfusionMatrix) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(
        out,
        "TN: {}\nFP: {}\nFN: {}\nTP: {}",
        matrix.true_negative, matrix.false_positive, matrix.false_negative, matrix.true_positive
    );
    let _ = writeln!(out, "Accuracy: {}", percent(matrix.accuracy()));
    let _ = writeln!(out, "Precision: {}", percent(matrix.precision()));
}

fn create_report_dir(base_dir: &Path) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format(REPORT_TIME_FORMAT).to_string();

    for attempt in 0.. {
        let dir = base_dir.join(format!("{}_{}_{}", REPORT_FOLDER_PREFIX, stamp, attempt));
        if dir.exists() {
            continue;
        }
        std::fs::create_dir_all(&dir)
            .context(format!("Failed to create report directory: {:?}", dir))?;
        return Ok(dir);
    }
    anyhow::bail!("No free report directory under {:?}", base_dir)
}

/// One line of `result.csv`; absent entities are written as `_`.
#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    sequence_id: usize,
    position: usize,
    token: &'a str,
    test_entity: &'a str,
    result_entity: &'a str,
    test_classified: u8,
    result_classified: u8,
    correct_predict: u8,
}

impl<'a> From<&'a ResultRow> for CsvRecord<'a> {
    fn from(row: &'a ResultRow) -> Self {
        Self {
            sequence_id: row.sequence_id,
            position: row.position,
            token: &row.token,
            test_entity: row.truth_entity.as_deref().unwrap_or(NO_ENTITY_SIGN),
            result_entity: row.predicted_entity.as_deref().unwrap_or(NO_ENTITY_SIGN),
            test_classified: row.ground_truth as u8,
            result_classified: row.predicted as u8,
            correct_predict: row.correct_predict as u8,
        }
    }
}

/// Per-token rows as CSV, header included even when there are no rows.
pub fn write_csv<W: std::io::Write>(out: W, rows: &[ResultRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(CsvRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}
