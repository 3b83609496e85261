//! Error taxonomy for the flattening engine.
//!
//! Every fallible step in the pipeline is tagged with one of the four kinds
//! below so callers can `match` on the failure class without parsing message
//! text, while the `anyhow::Error` payload still carries the full `.context`
//! chain for humans.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Read or seek failed on the outer or inner tar stream.
    InputRead,
    /// manifest.json is absent, empty, undecodable, or references a layer
    /// not present in the archive.
    BadManifest,
    /// An inner tar or gzip stream is malformed.
    LayerDecode,
    /// A write failed on the output sink.
    OutputWrite,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InputRead => "input read",
            ErrorKind::BadManifest => "bad manifest",
            ErrorKind::LayerDecode => "layer decode",
            ErrorKind::OutputWrite => "output write",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct FlattenError {
    kind: ErrorKind,
    source: anyhow::Error,
}

impl FlattenError {
    pub fn new(kind: ErrorKind, source: impl Into<anyhow::Error>) -> Self {
        FlattenError {
            kind,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for FlattenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.kind, self.source)
    }
}

impl std::error::Error for FlattenError {}

/// Tags an `anyhow::Result` with an [`ErrorKind`], turning it into a
/// [`FlattenError`]. Lets call sites keep using `.context("...")?` idiomatically
/// and attach the kind at the boundary where it's known.
pub trait WithKind<T> {
    fn with_kind(self, kind: ErrorKind) -> Result<T, FlattenError>;
}

impl<T> WithKind<T> for anyhow::Result<T> {
    fn with_kind(self, kind: ErrorKind) -> Result<T, FlattenError> {
        self.map_err(|e| FlattenError::new(kind, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn with_kind_tags_errors() {
        let result: anyhow::Result<()> = Err(anyhow!("boom"));
        let err = result.with_kind(ErrorKind::BadManifest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadManifest);
        assert!(err.to_string().contains("boom"));
    }
}
