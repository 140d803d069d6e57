//! HPGL job framing and the boundary to the external renderer.
//!
//! The renderer produces the command body; this module only adds the
//! initialize/park/re-initialize sequences every job needs on the wire.

pub mod render;

pub use render::{HpglFile, HpglRenderer};

use std::path::PathBuf;

/// Sent before the body: initialize the plotter
pub const PREAMBLE: &str = "IN";
/// Sent after the body: pen up to the origin, select pen 0, re-initialize
pub const TRAILER: &str = ";PU0,0;SP0;IN; ";

/// A pre-rendered HPGL command body, treated as an opaque blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HpglDocument(Vec<u8>);

impl HpglDocument {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self(body.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for HpglDocument {
    fn from(body: String) -> Self {
        Self(body.into_bytes())
    }
}

impl From<&str> for HpglDocument {
    fn from(body: &str) -> Self {
        Self(body.as_bytes().to_vec())
    }
}

/// Wrap `body` with the job preamble and trailer. The body is not inspected.
pub fn frame(body: &HpglDocument) -> Vec<u8> {
    let mut framed = Vec::with_capacity(PREAMBLE.len() + body.len() + TRAILER.len());
    framed.extend_from_slice(PREAMBLE.as_bytes());
    framed.extend_from_slice(body.as_bytes());
    framed.extend_from_slice(TRAILER.as_bytes());
    framed
}

pub fn frame_str(body: &str) -> String {
    format!("{}{}{}", PREAMBLE, body, TRAILER)
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} contains no HPGL")]
    Empty(PathBuf),

    #[error("HPGL generation failed: {0}")]
    Renderer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_wraps_body() {
        let body = HpglDocument::from("PU0,0;PD100,100;");
        assert_eq!(frame(&body), b"INPU0,0;PD100,100;;PU0,0;SP0;IN; ".to_vec());
    }

    #[test]
    fn test_frame_empty_body() {
        assert_eq!(frame(&HpglDocument::default()), b"IN;PU0,0;SP0;IN; ".to_vec());
        assert_eq!(frame_str(""), "IN;PU0,0;SP0;IN; ");
    }

    #[test]
    fn test_frame_does_not_validate() {
        let body = HpglDocument::new(vec![0xff, 0x00, b'I', b'N']);
        let framed = frame(&body);
        assert_eq!(&framed[2..6], &[0xff, 0x00, b'I', b'N']);
        assert!(framed.ends_with(TRAILER.as_bytes()));
    }

    #[test]
    fn test_frame_str_matches_frame() {
        let body = "SP1;PA0,0;PD1016,0;";
        assert_eq!(frame_str(body).into_bytes(), frame(&body.into()));
    }
}
