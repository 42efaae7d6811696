use std::path::Path;

use crate::extract::{extract, ExtractError, ExtractOptions, ExtractSummary};
use crate::file_io::{read_map_file, FileError};

#[derive(thiserror::Error, Debug)]
pub enum CLIError {
    #[error("cannot read sourcemap: {0}")]
    File(#[from] FileError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Read a `.map` file from disk and recover its sources into `out_dir`.
pub async fn extract_file(map_path: &Path, out_dir: &Path, options: &ExtractOptions) -> Result<ExtractSummary, CLIError> {
    let bytes = read_map_file(map_path).await?;
    Ok(extract(&bytes, out_dir, options)?)
}
