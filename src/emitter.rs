//! Third pass: rescan every layer and write the entries that survive the
//! precedence/whiteout/opaque filters to the output tar, in GNU format with
//! mode bits normalized.

use std::io;
use std::io::{Read, Seek, Write};

use anyhow::Context;

use crate::error::{ErrorKind, FlattenError, WithKind};
use crate::index::Index;
use crate::layer;
use crate::manifest::LayerOffset;
use crate::path_tree::PathTree;
use crate::utils::clean_components;

fn clean(path: &str) -> String {
    clean_components(path).join("/")
}

/// Re-write a tar header for `entry`, masking the mode to 0o777 and forcing
/// GNU format; every other field is carried over verbatim.
fn build_header<R: Read>(entry: &tar::Entry<'_, R>) -> anyhow::Result<tar::Header> {
    let src = entry.header();
    let mut out = tar::Header::new_gnu();
    out.set_entry_type(src.entry_type());
    out.set_size(src.size()?);
    out.set_mode(src.mode()? & 0o777);
    out.set_uid(src.uid()?);
    out.set_gid(src.gid()?);
    if let Some(uname) = src.username()? {
        out.set_username(uname)?;
    }
    if let Some(gname) = src.groupname()? {
        out.set_groupname(gname)?;
    }
    out.set_mtime(src.mtime()?);
    if let Some(major) = src.device_major()? {
        out.set_device_major(major)?;
    }
    if let Some(minor) = src.device_minor()? {
        out.set_device_minor(minor)?;
    }
    Ok(out)
}

pub fn emit<R, W>(
    input: &mut R,
    output: &mut W,
    layers: &[LayerOffset],
    index: &Index,
    opaque_trees: &[PathTree],
) -> Result<(), FlattenError>
where
    R: Read + Seek,
    W: Write,
{
    let mut builder = tar::Builder::new(output);

    for (i, layer) in layers.iter().enumerate() {
        let mut archive = layer::open_at(input, layer.offset)
            .with_context(|| format!("open layer {}", layer.name))
            .with_kind(ErrorKind::LayerDecode)?;

        let entries = archive
            .entries()
            .with_context(|| format!("read entries of layer {}", layer.name))
            .with_kind(ErrorKind::LayerDecode)?;

        for entry in entries {
            let mut entry = entry
                .with_context(|| format!("read entry in layer {}", layer.name))
                .with_kind(ErrorKind::LayerDecode)?;

            let entry_type = entry.header().entry_type();
            let raw_name = entry
                .path()
                .context("read entry path")
                .with_kind(ErrorKind::LayerDecode)?
                .to_string_lossy()
                .into_owned();
            // `name` is used only to consult the precedence/whiteout maps, which
            // were built from cleaned paths; the header we emit keeps `raw_name`
            // verbatim per the Name-preserved-verbatim normalization rule.
            let name = clean(&raw_name);

            if let Some(&at) = index.whiteout.get(&name) {
                if at >= i {
                    continue;
                }
            }

            if opaque_trees[i].has_prefix(&name) {
                continue;
            }

            if entry_type != tar::EntryType::Directory
                && index.file_to_layer.get(&name).copied() != Some(i)
            {
                continue;
            }

            let mut header = build_header(&entry)
                .context("build output header")
                .with_kind(ErrorKind::LayerDecode)?;

            let write_result = if entry_type == tar::EntryType::Symlink
                || entry_type == tar::EntryType::Link
            {
                let link_name = entry
                    .link_name()
                    .context("read link target")
                    .with_kind(ErrorKind::LayerDecode)?
                    .ok_or_else(|| anyhow::anyhow!("{} has no link target", name))
                    .with_kind(ErrorKind::LayerDecode)?
                    .into_owned();
                builder.append_link(&mut header, &raw_name, &link_name)
            } else if entry_type == tar::EntryType::Regular {
                builder.append_data(&mut header, &raw_name, &mut entry)
            } else {
                builder.append_data(&mut header, &raw_name, io::empty())
            };

            write_result
                .context("write output tar entry")
                .with_kind(ErrorKind::OutputWrite)?;
        }
    }

    builder
        .into_inner()
        .context("finish output tar")
        .with_kind(ErrorKind::OutputWrite)?
        .flush()
        .context("flush output")
        .with_kind(ErrorKind::OutputWrite)
}
