use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

/// Reads the interviewer's system instructions. An empty file is an error: the
/// agent would otherwise join the room with no persona at all.
pub fn load_instructions(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read instructions file: {}", path.display()))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        bail!("Instructions file is empty: {}", path.display());
    }
    Ok(trimmed.to_string())
}
