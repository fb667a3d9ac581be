//! Offline pass over the server's JSON log.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

const RESERVE_ACTION: &str = "reserve";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub lines: u64,
    /// Lines that were not JSON objects.
    pub skipped: u64,
    pub successes: u64,
    pub conflicts: u64,
    /// Reserve events whose error reports connection exhaustion on the database side.
    pub too_many_connections: u64,
    /// Every reserve status seen, including the two above.
    pub reserve_statuses: BTreeMap<String, u64>,
}

impl AuditSummary {
    pub fn consume_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.lines += 1;

        let Ok(Value::Object(event)) = serde_json::from_str::<Value>(line) else {
            self.skipped += 1;
            return;
        };

        // The JSON formatter nests event fields under "fields"; accept flat lines too.
        let fields = match event.get("fields") {
            Some(Value::Object(fields)) => fields,
            _ => &event,
        };

        if fields.get("action").and_then(Value::as_str) != Some(RESERVE_ACTION) {
            return;
        }

        if let Some(status) = fields.get("status").and_then(Value::as_str) {
            *self.reserve_statuses.entry(status.to_string()).or_default() += 1;
            match status {
                "success" => self.successes += 1,
                "seat_conflict" => self.conflicts += 1,
                _ => {}
            }
        }

        if fields
            .get("error")
            .and_then(Value::as_str)
            .is_some_and(is_connection_exhaustion)
        {
            self.too_many_connections += 1;
        }
    }

    /// Successes must equal the number of seats handed out, when known.
    pub fn matches_expected(&self, expected: Option<u64>) -> bool {
        expected.is_none_or(|n| n == self.successes)
    }
}

fn is_connection_exhaustion(error: &str) -> bool {
    let error = error.to_ascii_lowercase();
    error.contains("too many connections") || error.contains("too many clients")
}

pub fn audit_reader(reader: impl BufRead) -> std::io::Result<AuditSummary> {
    let mut summary = AuditSummary::default();
    for line in reader.lines() {
        summary.consume_line(&line?);
    }
    Ok(summary)
}

pub fn audit_file(path: &Path) -> anyhow::Result<AuditSummary> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    audit_reader(BufReader::new(file)).with_context(|| format!("failed to read {}", path.display()))
}
