//! Reading and writing the interview files, and selector lookup over the
//! enriched corpus.

use crate::interview::{EnrichedRecord, RawInterview};
use crate::ExitIntelError;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Read the raw interview export (a JSON array).
pub fn read_interviews(path: &Path) -> Result<Vec<RawInterview>, ExitIntelError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ExitIntelError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Load the enriched corpus written by `analyze`.
pub fn load_corpus(path: &Path) -> Result<Vec<EnrichedRecord>, ExitIntelError> {
    if !path.exists() {
        return Err(ExitIntelError::CorpusNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let corpus: Vec<EnrichedRecord> = serde_json::from_str(&content)?;

    let dupes = duplicate_ids(&corpus);
    if !dupes.is_empty() {
        log::warn!(
            "{}: duplicate employee IDs {}; lookups by these IDs will be ambiguous",
            path.display(),
            dupes.join(", ")
        );
    }
    log::debug!("loaded {} records from {}", corpus.len(), path.display());
    Ok(corpus)
}

/// Replace `path` wholesale with `records`. Writes a sibling temp file and
/// renames it so a failed run never leaves a half-written corpus behind.
pub fn write_corpus(path: &Path, records: &[EnrichedRecord]) -> Result<(), ExitIntelError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ExitIntelError::Config(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let mut file = std::fs::File::create(&tmp)?;
    serde_json::to_writer_pretty(&mut file, records)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Employee IDs that occur more than once, sorted.
pub fn duplicate_ids(corpus: &[EnrichedRecord]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in corpus {
        *counts.entry(r.interview.employee_id.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Resolve a selector to exactly one record. The selector is the display
/// name (`Name (ID)`) or a bare employee ID.
pub fn lookup_record<'a>(
    corpus: &'a [EnrichedRecord],
    selector: &str,
) -> Result<&'a EnrichedRecord, ExitIntelError> {
    let selector = selector.trim();
    let matches: Vec<&EnrichedRecord> = corpus
        .iter()
        .filter(|r| r.display_name() == selector || r.interview.employee_id == selector)
        .collect();

    match matches.as_slice() {
        [] => Err(ExitIntelError::NotFound(selector.to_string())),
        [one] => Ok(one),
        many => Err(ExitIntelError::AmbiguousSelector {
            selector: selector.to_string(),
            matches: many.len(),
        }),
    }
}
