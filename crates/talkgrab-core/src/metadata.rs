//! Per-talk metadata files.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calendar::Talk;
use crate::filename::talk_filename;

/// Writes the talk's full calendar record as pretty-printed JSON (keys
/// sorted) to `<sanitized-title>.json` under `dir`. Returns the path.
pub fn write_metadata(talk: &Talk, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", talk_filename(&talk.title)));
    let json = serde_json::to_string_pretty(&talk.raw)
        .with_context(|| format!("serialize metadata for talk {}", talk.id))?;
    fs::write(&path, json)
        .with_context(|| format!("write metadata file: {}", path.display()))?;
    Ok(path)
}
