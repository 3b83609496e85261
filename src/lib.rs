//! Flattens a Docker/OCI container image archive (a tarball of layered
//! tarballs) into a single root-filesystem tarball, honoring the
//! AUFS-derived whiteout conventions Docker uses for layer deletions.
//!
//! The entry point is [`flatten`]: given a seekable image archive and a byte
//! sink, it writes one GNU-format tar stream equivalent to what an overlay
//! filesystem would expose after applying every layer in manifest order.

pub mod error;
mod emitter;
mod index;
mod layer;
mod manifest;
mod path_tree;
mod utils;
mod whiteout;

use std::io::{Read, Seek, Write};

pub use error::{ErrorKind, FlattenError};
pub use manifest::ManifestEntry;
pub use path_tree::PathTree;

/// Flattens the image archive read from `input` into a single GNU-format tar
/// stream written to `output`.
///
/// `input` must be seekable: the outer tar is scanned three times (manifest
/// + offsets, per-layer indexing, per-layer emission), seeking directly to
/// each layer's recorded offset rather than buffering the whole archive.
pub fn flatten<R, W>(mut input: R, mut output: W) -> Result<(), FlattenError>
where
    R: Read + Seek,
    W: Write,
{
    let layers = manifest::scan(&mut input)?;
    let index = index::build(&mut input, &layers)?;
    let opaque_trees = index.opaque_trees(layers.len());
    emitter::emit(&mut input, &mut output, &layers, &index, &opaque_trees)
}
