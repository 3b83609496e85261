//! Second pass: scan every layer once (in manifest order) and build the
//! three precedence maps plus the per-layer opaque-directory `PathTree`
//! vector that the Emitter needs to decide, for every tar entry, whether a
//! higher layer already supersedes or hides it.

use std::collections::HashMap;
use std::io::{Read, Seek};

use anyhow::Context;

use crate::error::{ErrorKind, FlattenError, WithKind};
use crate::layer;
use crate::manifest::LayerOffset;
use crate::path_tree::PathTree;
use crate::utils::clean_components;
use crate::whiteout::{is_opaque, is_whiteout, opaque_dir, whiteout_target};

#[derive(Debug, Default)]
pub struct Index {
    /// path -> highest layer index containing a non-directory, non-whiteout
    /// entry named `path`.
    pub file_to_layer: HashMap<String, usize>,
    /// directory path -> topmost layer index that marked it opaque.
    pub opaque_dir: HashMap<String, usize>,
    /// path -> topmost layer index with a single-entry whiteout for it.
    pub whiteout: HashMap<String, usize>,
}

impl Index {
    /// Build, for each layer `i`, a `PathTree` of directories whose contents
    /// from layer `i` must be suppressed because a higher layer declared
    /// them opaque. See SPEC_FULL.md §4.4.
    pub fn opaque_trees(&self, layer_count: usize) -> Vec<PathTree> {
        let mut trees: Vec<PathTree> = (0..layer_count).map(|_| PathTree::empty()).collect();

        for (dir, &marker_layer) in &self.opaque_dir {
            if marker_layer > 0 {
                trees[marker_layer - 1].add(dir);
            }
        }

        for i in (1..layer_count).rev() {
            let (lower, upper) = trees.split_at_mut(i);
            lower[i - 1].merge(&upper[0]);
        }

        trees
    }
}

fn clean(path: &str) -> String {
    clean_components(path).join("/")
}

pub fn build<R: Read + Seek>(
    input: &mut R,
    layers: &[LayerOffset],
) -> Result<Index, FlattenError> {
    let mut index = Index::default();

    for (i, layer) in layers.iter().enumerate() {
        let mut archive = layer::open_at(input, layer.offset)
            .with_context(|| format!("open layer {}", layer.name))
            .with_kind(ErrorKind::LayerDecode)?;

        let entries = archive
            .entries()
            .with_context(|| format!("read entries of layer {}", layer.name))
            .with_kind(ErrorKind::LayerDecode)?;

        for entry in entries {
            let entry = entry
                .with_context(|| format!("read entry in layer {}", layer.name))
                .with_kind(ErrorKind::LayerDecode)?;

            let entry_type = entry.header().entry_type();
            if entry_type == tar::EntryType::Directory {
                continue;
            }

            let name = clean(
                &entry
                    .path()
                    .context("read entry path")
                    .with_kind(ErrorKind::LayerDecode)?
                    .to_string_lossy(),
            );

            let recognizes_whiteout =
                entry_type == tar::EntryType::Link || entry_type == tar::EntryType::Regular;

            if recognizes_whiteout && is_opaque(&name) {
                index.opaque_dir.insert(opaque_dir(&name).to_string(), i);
            } else if recognizes_whiteout && is_whiteout(&name) {
                index.whiteout.insert(whiteout_target(&name), i);
            } else {
                index.file_to_layer.insert(name, i);
            }
        }
    }

    Ok(index)
}
