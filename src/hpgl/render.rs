use std::path::{Path, PathBuf};

use super::{HpglDocument, RenderError};

/// Produces the HPGL body for the active document
pub trait HpglRenderer: Send + Sync {
    fn render(&self) -> Result<HpglDocument, RenderError>;
}

impl HpglRenderer for HpglDocument {
    fn render(&self) -> Result<HpglDocument, RenderError> {
        Ok(self.clone())
    }
}

/// HPGL already written to disk by the encoder (`.hpgl` / `.plt`)
#[derive(Debug, Clone)]
pub struct HpglFile {
    path: PathBuf,
}

impl HpglFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HpglRenderer for HpglFile {
    fn render(&self) -> Result<HpglDocument, RenderError> {
        let body = std::fs::read(&self.path).map_err(|source| RenderError::Io {
            path: self.path.clone(),
            source,
        })?;

        // Trailing newlines from editors are not part of the job
        let end = body
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        if end == 0 {
            return Err(RenderError::Empty(self.path.clone()));
        }

        log::debug!("Read {} bytes of HPGL from {}", end, self.path.display());
        Ok(HpglDocument::new(&body[..end]))
    }
}
