use crate::errors::{AppError, Result};
use crate::services::history::HistoryService;
use crate::services::normalizer::Normalizer;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// One processed row with its derived length metrics. Lengths are counted in
/// characters, matching how the comparison is presented to the user.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct ProcessedRow {
    pub original: String,
    pub normalized: String,
    pub original_length: usize,
    pub cleaned_length: usize,
    pub reduction: i64,
    pub reduction_percent: f64,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct BatchSummary {
    pub total_rows: usize,
    pub mean_reduction: f64,
    pub mean_reduction_percent: f64,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub rows: Vec<ProcessedRow>,
    pub summary: BatchSummary,
    /// The input table with the normalized and metric columns appended.
    pub result_csv: String,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

const DERIVED_COLUMNS: [&str; 5] = [
    "Normalized_Claim",
    "Original_Length",
    "Cleaned_Length",
    "Reduction",
    "Reduction_%",
];

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Reduction percentage, one decimal place. Defined as 0.0 for empty input
/// rather than letting a division by zero leak NaN into serialized output.
fn reduction_percent(original_length: usize, reduction: i64) -> f64 {
    if original_length == 0 {
        return 0.0;
    }
    round1(reduction as f64 / original_length as f64 * 100.0)
}

fn metrics_for(original: &str, normalized: &str) -> ProcessedRow {
    let original_length = original.chars().count();
    let cleaned_length = normalized.chars().count();
    let reduction = original_length as i64 - cleaned_length as i64;
    ProcessedRow {
        original: original.to_string(),
        normalized: normalized.to_string(),
        original_length,
        cleaned_length,
        reduction,
        reduction_percent: reduction_percent(original_length, reduction),
    }
}

/// Runs one uploaded table through the normalizer, row by row, recording each
/// result to history as it goes. Strictly sequential; wall-clock time is
/// linear in row count times external-call latency.
pub struct BatchService {
    normalizer: Arc<dyn Normalizer>,
    history: HistoryService,
}

impl BatchService {
    pub fn new(normalizer: Arc<dyn Normalizer>, history: HistoryService) -> Self {
        Self { normalizer, history }
    }

    /// Parse headers and the first `limit` rows, for the upload preview step.
    pub fn preview(csv_bytes: &[u8], limit: usize) -> Result<CsvPreview> {
        let mut reader = csv::Reader::from_reader(csv_bytes);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ValidationError(format!("Could not parse CSV: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        let mut total_rows = 0;
        for record in reader.records() {
            let record = record
                .map_err(|e| AppError::ValidationError(format!("Could not parse CSV: {}", e)))?;
            if total_rows < limit {
                rows.push(record.iter().map(|f| f.to_string()).collect());
            }
            total_rows += 1;
        }

        Ok(CsvPreview {
            headers,
            rows,
            total_rows,
        })
    }

    pub async fn process<F>(
        &self,
        user_id: &Uuid,
        csv_bytes: &[u8],
        column: &str,
        mut on_progress: F,
    ) -> Result<BatchOutcome>
    where
        F: FnMut(usize, usize),
    {
        let mut reader = csv::Reader::from_reader(csv_bytes);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ValidationError(format!("Could not parse CSV: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let column_index = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| AppError::ValidationError(format!("Column '{}' not found", column)))?;

        let records: Vec<csv::StringRecord> = reader
            .records()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AppError::ValidationError(format!("Could not parse CSV: {}", e)))?;
        let total = records.len();

        let mut rows = Vec::with_capacity(total);
        for (index, record) in records.iter().enumerate() {
            let text = record.get(column_index).unwrap_or("");
            let cleaned = self.normalizer.normalize(text).await;

            // Best effort: the write already logged its own failure.
            let _ = self.history.record(user_id, text, &cleaned).await;

            rows.push(metrics_for(text, &cleaned));
            on_progress(index + 1, total);
        }

        let summary = summarize(&rows);
        let result_csv = write_result_csv(&headers, records.as_slice(), &rows)?;

        info!(
            action = "batch_complete",
            user_id = %user_id,
            rows = summary.total_rows,
        );

        Ok(BatchOutcome {
            rows,
            summary,
            result_csv,
        })
    }
}

fn summarize(rows: &[ProcessedRow]) -> BatchSummary {
    let total_rows = rows.len();
    if total_rows == 0 {
        return BatchSummary {
            total_rows: 0,
            mean_reduction: 0.0,
            mean_reduction_percent: 0.0,
        };
    }

    let reduction_sum: i64 = rows.iter().map(|r| r.reduction).sum();
    let percent_sum: f64 = rows.iter().map(|r| r.reduction_percent).sum();
    BatchSummary {
        total_rows,
        mean_reduction: round1(reduction_sum as f64 / total_rows as f64),
        mean_reduction_percent: round1(percent_sum / total_rows as f64),
    }
}

fn write_result_csv(
    headers: &[String],
    records: &[csv::StringRecord],
    rows: &[ProcessedRow],
) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header_row: Vec<String> = headers.to_vec();
    header_row.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));
    writer.write_record(&header_row)?;

    for (record, row) in records.iter().zip(rows) {
        let mut out: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        out.push(row.normalized.clone());
        out.push(row.original_length.to_string());
        out.push(row.cleaned_length.to_string());
        out.push(row.reduction.to_string());
        out.push(format!("{:.1}", row.reduction_percent));
        writer.write_record(&out)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_and_percent() {
        let row = metrics_for("a somewhat verbose claim", "short claim");
        assert_eq!(row.original_length, 24);
        assert_eq!(row.cleaned_length, 11);
        assert_eq!(row.reduction, 13);
        assert_eq!(row.reduction_percent, 54.2);
    }

    #[test]
    fn growth_yields_negative_reduction() {
        let row = metrics_for("wet", "The claimant reports water ingress");
        assert!(row.reduction < 0);
        assert!(row.reduction_percent < 0.0);
    }

    #[test]
    fn empty_original_defined_as_zero_percent() {
        let row = metrics_for("", "NORMALIZED:");
        assert_eq!(row.original_length, 0);
        assert_eq!(row.reduction_percent, 0.0);
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        // 1/3 of 100 = 33.333...
        assert_eq!(reduction_percent(3, 1), 33.3);
        assert_eq!(reduction_percent(3, 2), 66.7);
    }

    #[test]
    fn summary_of_empty_batch() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_rows, 0);
        assert_eq!(summary.mean_reduction, 0.0);
    }

    #[test]
    fn preview_caps_rows_but_counts_all() {
        let csv = b"text,severity\nclaim A,low\nclaim B,high\nclaim C,low\n";
        let preview = BatchService::preview(csv, 2).unwrap();
        assert_eq!(preview.headers, vec!["text", "severity"]);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.total_rows, 3);
    }

    #[test]
    fn preview_rejects_garbage() {
        let csv = b"a,b\n\"unterminated";
        assert!(BatchService::preview(csv, 5).is_err());
    }
}
