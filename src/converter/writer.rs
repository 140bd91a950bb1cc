use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::ExportResult;
use crate::Result;

/// Write every document to `<dir>/<namespace>.schema.json`, creating `dir`
/// if needed. Returns the written paths in export order.
pub fn write_schemas(result: &ExportResult, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(result.schemas.len());
    for document in result.schemas.values() {
        let path = dir.join(format!("{}.schema.json", document.namespace));
        let content = serde_json::to_string_pretty(document)?;
        fs::write(&path, content)?;
        written.push(path);
    }

    info!("Wrote {} schema documents to {}", written.len(), dir.display());
    Ok(written)
}
