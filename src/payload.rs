//! Embedding payloads from an export artifact.
//!
//! Reads the concatenated JSON arrays written by `harvest run`, flattens
//! every document to a single `key: value` line, and emits one JSON
//! object per line: `{"user_id": ..., "text": "..."}`.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use profile_harvest_core::flatten::{flatten, to_text};

use crate::config::Config;

/// Read `input` (defaults to the configured output path) and write
/// payload lines to `output`, or stdout when absent.
pub fn run_payload(config: &Config, input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let input = input.unwrap_or(config.output.path.as_path());
    let file = std::fs::File::open(input)
        .with_context(|| format!("Failed to open export artifact: {}", input.display()))?;
    let reader = BufReader::new(file);

    let count = match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create payload file: {}", path.display()))?;
            let mut out = BufWriter::new(file);
            let n = write_payloads(reader, &mut out, &config.payload.separator)?;
            out.flush()?;
            n
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_payloads(reader, &mut out, &config.payload.separator)?
        }
    };

    eprintln!("payload: {} documents", count);
    Ok(())
}

/// Stream documents from `reader` and write one payload line each.
///
/// The artifact may hold any number of top-level arrays back to back.
/// Returns the number of documents written.
pub fn write_payloads<R: BufRead, W: Write>(reader: R, out: &mut W, separator: &str) -> Result<usize> {
    let mut count = 0;
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();
    for (batch_idx, batch) in stream.enumerate() {
        let batch = batch.with_context(|| format!("Malformed JSON in batch {}", batch_idx))?;
        let Value::Array(documents) = batch else {
            bail!("batch {} is not a JSON array", batch_idx);
        };
        for document in documents {
            let line = payload_line(&document, separator)
                .with_context(|| format!("batch {}, document {}", batch_idx, count))?;
            serde_json::to_writer(&mut *out, &line)?;
            out.write_all(b"\n")?;
            count += 1;
        }
    }
    Ok(count)
}

/// Build the payload object for one composite document.
pub fn payload_line(document: &Value, separator: &str) -> Result<Value> {
    let Some(object) = document.as_object() else {
        bail!("document is not a JSON object");
    };
    let user_id = object.get("user_id").cloned().unwrap_or(Value::Null);
    let text = to_text(&flatten(object, separator));
    Ok(json!({ "user_id": user_id, "text": text }))
}
