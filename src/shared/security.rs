use crate::shared::Result;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Maximum size of an input file (replay logs, policy files)
pub const MAX_INPUT_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Reads an operator-supplied input file after checking that it is a regular
/// file, not a symbolic link, and within the size limit.
///
/// # Arguments
/// * `path` - The file to read
/// * `file_description` - Used in error messages (e.g. "replay file")
///
/// # Errors
/// Returns an error if any check fails or the file cannot be read.
pub fn read_input_file(path: &Path, file_description: &str) -> Result<String> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read {} metadata: {}", file_description, path.display()))?;

    if metadata.is_symlink() {
        anyhow::bail!(
            "Security: {} is a symbolic link. For security reasons, symbolic links are not allowed.",
            path.display()
        );
    }

    if !metadata.is_file() {
        anyhow::bail!("{} is not a regular file", path.display());
    }

    if metadata.len() > MAX_INPUT_FILE_SIZE {
        anyhow::bail!(
            "Security: {} is too large ({} bytes). Maximum allowed size is {} bytes.",
            path.display(),
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        );
    }

    fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", file_description, path.display()))
}
