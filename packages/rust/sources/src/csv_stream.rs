//! Push-based CSV row decoding.
//!
//! The decoder runs on a blocking task and pushes one [`CsvRow`] per record
//! into a bounded channel. The consumer must drain the stream to its end
//! before acting on any row: [`collect_rows`] returns the complete row set or
//! the first decode error, never a prefix.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use tagtree_shared::{Result, TagtreeError};

/// Rows buffered in the channel before the decoder waits.
const ROW_BUFFER: usize = 256;

/// One decoded CSV record, paired with its raw column headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line number of the record in the source.
    pub line: u64,
    /// `(header, raw value)` in column order.
    pub fields: Vec<(String, String)>,
}

/// A one-shot, non-restartable row producer.
#[derive(Debug)]
pub struct RowStream {
    rows: mpsc::Receiver<Result<CsvRow>>,
    decoder: JoinHandle<()>,
}

/// Start decoding `bytes` as CSV with a header row.
///
/// Must be called from within a tokio runtime.
pub fn spawn_rows(bytes: Vec<u8>) -> RowStream {
    let (tx, rows) = mpsc::channel(ROW_BUFFER);

    let decoder = tokio::task::spawn_blocking(move || {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());

        let headers = match reader.headers() {
            Ok(h) => h.clone(),
            Err(e) => {
                let _ = tx.blocking_send(Err(TagtreeError::decode(format!("CSV header: {e}"))));
                return;
            }
        };

        for record in reader.records() {
            let item = record
                .map(|r| CsvRow {
                    line: r.position().map(|p| p.line()).unwrap_or_default(),
                    fields: headers
                        .iter()
                        .zip(r.iter())
                        .map(|(h, v)| (h.to_string(), v.to_string()))
                        .collect(),
                })
                .map_err(|e| TagtreeError::decode(format!("CSV record: {e}")));

            let failed = item.is_err();
            if tx.blocking_send(item).is_err() || failed {
                return;
            }
        }
    });

    RowStream { rows, decoder }
}

/// Await end-of-stream and return every row.
pub async fn collect_rows(stream: RowStream) -> Result<Vec<CsvRow>> {
    let RowStream { mut rows, decoder } = stream;

    let mut out = Vec::new();
    while let Some(row) = rows.recv().await {
        out.push(row?);
    }

    decoder
        .await
        .map_err(|e| TagtreeError::decode(format!("CSV decoder task failed: {e}")))?;

    debug!(rows = out.len(), "CSV stream complete");
    Ok(out)
}
