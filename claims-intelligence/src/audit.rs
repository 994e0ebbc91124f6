use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use crate::decision::DecisionLabel;
use crate::error::{ClaimsError, Result};
use crate::models::ClaimType;

/// Columns of the audit log, in file order.
pub const AUDIT_COLUMNS: [&str; 5] = [
    "timestamp",
    "claim_type",
    "decision",
    "appeal_score",
    "human_review",
];

/// One explanation event. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub claim_type: ClaimType,
    pub decision: DecisionLabel,
    pub appeal_score: f64,
    pub human_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStats {
    pub decision: DecisionLabel,
    pub count: usize,
    pub mean_appeal_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: usize,
    pub flagged_for_review: usize,
    pub by_decision: Vec<DecisionStats>,
}

/// Append-only CSV audit log.
///
/// Appends are serialised by an in-process lock, which makes "create with
/// header if absent or empty, then append" a single step for this process.
/// The log assumes a single writer process: two processes appending to the
/// same file can interleave the header check and corrupt the file.
pub struct AuditLogger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, writing the header first when the file is missing or zero bytes.
    pub fn record(&self, record: &AuditRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        debug!(
            path = %self.path.display(),
            header_written = needs_header,
            decision = %record.decision,
            "Audit record appended"
        );
        Ok(())
    }

    /// Read every record. A missing or empty file is an empty log; a header
    /// that is not exactly [`AUDIT_COLUMNS`] is a [`ClaimsError::Schema`].
    pub fn read(&self) -> Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<String> = headers.iter().map(str::to_string).collect();
        let found_set: BTreeSet<&str> = headers.iter().collect();
        let expected_set: BTreeSet<&str> = AUDIT_COLUMNS.into_iter().collect();
        if found.len() != AUDIT_COLUMNS.len() || found_set != expected_set {
            return Err(ClaimsError::Schema {
                expected: AUDIT_COLUMNS.iter().map(|c| c.to_string()).collect(),
                found,
            });
        }

        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<AuditRecord>, _>>()?;
        info!(path = %self.path.display(), records = records.len(), "Audit log loaded");
        Ok(records)
    }
}

/// Per-decision counts and mean appeal score.
pub fn summarize(records: &[AuditRecord]) -> AuditSummary {
    let mut groups: BTreeMap<&'static str, (DecisionLabel, usize, f64)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry(record.decision.as_str())
            .or_insert((record.decision, 0, 0.0));
        entry.1 += 1;
        entry.2 += record.appeal_score;
    }

    AuditSummary {
        total: records.len(),
        flagged_for_review: records.iter().filter(|r| r.human_review).count(),
        by_decision: groups
            .into_values()
            .map(|(decision, count, total_score)| DecisionStats {
                decision,
                count,
                mean_appeal_score: total_score / count as f64,
            })
            .collect(),
    }
}
