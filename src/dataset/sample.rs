use std::path::Path;

use crate::error::Result;

/// An undecoded image plus the file name its label is read from.
#[derive(Debug, Clone)]
pub struct RawSample {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RawSample {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        RawSample { filename: filename.into(), bytes }
    }

    /// Reads the file at `path`; the label source is its final component.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(RawSample { filename, bytes })
    }
}

/// Reads every regular file directly inside `dir`, sorted by file name.
pub fn read_dir_samples(dir: impl AsRef<Path>) -> Result<Vec<RawSample>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    paths.into_iter().map(RawSample::from_path).collect()
}
