//! First pass over the outer tar: decode `manifest.json` and record the byte
//! offset of every regular-file entry, so the layers named in the manifest
//! can be looked up and seeked to directly in later passes.

use std::collections::HashMap;
use std::io::{Read, Seek};

use anyhow::Context;
use serde::Deserialize;

use crate::error::{ErrorKind, FlattenError, WithKind};
use crate::utils::clean_components;

const MANIFEST_JSON: &str = "manifest.json";

/// Docker manifest.json structure: a JSON array of image descriptors, of
/// which we only ever look at the first.
#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Config")]
    #[allow(dead_code)]
    pub config: Option<String>,

    #[serde(rename = "RepoTags")]
    #[allow(dead_code)]
    pub repo_tags: Option<Vec<String>>,

    #[serde(rename = "Layers")]
    pub layers: Vec<String>,
}

/// One layer's position in the manifest order and its byte offset in the
/// outer tar.
#[derive(Debug, Clone)]
pub struct LayerOffset {
    pub name: String,
    pub offset: u64,
}

fn clean(path: &str) -> String {
    clean_components(path).join("/")
}

/// Scan the outer tar for `manifest.json` and the offsets of every
/// regular-file entry, then resolve the manifest's ordered `Layers` list
/// against those offsets.
pub fn scan<R: Read + Seek>(input: &mut R) -> Result<Vec<LayerOffset>, FlattenError> {
    let mut archive = tar::Archive::new(&mut *input);
    let mut manifest_layers: Option<Vec<String>> = None;
    let mut offsets: HashMap<String, u64> = HashMap::new();

    let entries = archive
        .entries()
        .context("read outer tar entries")
        .with_kind(ErrorKind::InputRead)?;

    for entry in entries {
        let entry = entry
            .context("read outer tar entry")
            .with_kind(ErrorKind::InputRead)?;

        if entry.header().entry_type() != tar::EntryType::Regular {
            continue;
        }

        let raw_name = entry
            .path()
            .context("read outer tar entry path")
            .with_kind(ErrorKind::InputRead)?
            .to_string_lossy()
            .into_owned();
        let name = clean(&raw_name);

        if name == MANIFEST_JSON {
            let manifest: Vec<ManifestEntry> = serde_json::from_reader(entry)
                .context("decode manifest.json")
                .with_kind(ErrorKind::BadManifest)?;
            let first = manifest
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("manifest.json is empty"))
                .with_kind(ErrorKind::BadManifest)?;
            manifest_layers = Some(first.layers);
        } else {
            offsets.insert(name, entry.raw_file_position());
        }
    }

    let manifest_layers = manifest_layers
        .ok_or_else(|| anyhow::anyhow!("manifest.json not found in archive"))
        .with_kind(ErrorKind::BadManifest)?;

    manifest_layers
        .into_iter()
        .map(|name| {
            let cleaned = clean(&name);
            let offset = *offsets.get(&cleaned).ok_or_else(|| {
                anyhow::anyhow!("{} defined in manifest, missing in tarball", name)
            })?;
            Ok(LayerOffset { name, offset })
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .with_kind(ErrorKind::BadManifest)
}
