use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::records::{EnrichmentRecord, TitleRow};

/// Pretty-print `records` as a JSON array, replacing `path` atomically.
pub fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read records back. Risk scores must be in 1-5, as on the way in.
pub fn read_enrichment(path: &Path) -> Result<Vec<EnrichmentRecord>> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<EnrichmentRecord> =
        serde_json::from_str(&json).with_context(|| format!("Malformed records in {}", path.display()))?;
    for (i, r) in records.iter().enumerate() {
        anyhow::ensure!(
            (1..=5).contains(&r.analysis.risk_score),
            "record {} in {} has risk_score {} outside 1-5",
            i,
            path.display(),
            r.analysis.risk_score
        );
    }
    Ok(records)
}

/// `url,title` CSV. A missing title is an empty cell.
pub fn write_csv(path: &Path, rows: &[TitleRow]) -> Result<()> {
    let tmp = tmp_path(path);
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Tests ──
