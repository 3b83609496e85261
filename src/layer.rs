//! Opens a layer payload (a byte range inside the outer tar) as a tar entry
//! stream, transparently decompressing gzip-compressed layers.
//!
//! Docker has historically shipped both plain `layer.tar` and gzip-compressed
//! payloads; sniffing the first two bytes and rewinding is cheaper and more
//! robust than trusting the layer's name.

use std::io::{Read, Seek, SeekFrom};

use flate2::read::GzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Positions `input` at `offset` and returns a tar archive over the layer
/// payload found there, decompressing gzip on the fly if present.
///
/// The returned `tar::Archive` borrows `input` for its lifetime; dropping it
/// releases the gzip decoder state, there is no separate close step needed.
pub fn open_at<'a, R: Read + Seek>(
    input: &'a mut R,
    offset: u64,
) -> anyhow::Result<tar::Archive<Box<dyn Read + 'a>>> {
    input.seek(SeekFrom::Start(offset))?;

    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < magic.len() {
        let n = input.read(&mut magic[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    if read < magic.len() {
        anyhow::bail!("input too small");
    }
    input.seek(SeekFrom::Current(-(magic.len() as i64)))?;

    let body: Box<dyn Read + 'a> = if magic == GZIP_MAGIC {
        Box::new(GzDecoder::new(input))
    } else {
        Box::new(input)
    };

    Ok(tar::Archive::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    fn plain_tar_with_one_file(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, name, contents).unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn opens_plain_tar() {
        let bytes = plain_tar_with_one_file("hello", b"world");
        let mut cursor = Cursor::new(bytes);
        let mut archive = open_at(&mut cursor, 0).unwrap();
        let mut entries = archive.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str().unwrap(), "hello");
    }

    #[test]
    fn opens_gzipped_tar() {
        let inner = plain_tar_with_one_file("hello", b"world");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&inner).unwrap();
        let gzipped = encoder.finish().unwrap();

        let mut cursor = Cursor::new(gzipped);
        let mut archive = open_at(&mut cursor, 0).unwrap();
        let mut entries = archive.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str().unwrap(), "hello");
    }

    #[test]
    fn rejects_too_small_input() {
        let mut cursor = Cursor::new(vec![0u8]);
        let err = open_at(&mut cursor, 0).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn seeks_to_requested_offset() {
        let mut combined = vec![0xffu8; 16];
        let inner = plain_tar_with_one_file("at-offset", b"data");
        combined.extend_from_slice(&inner);

        let mut cursor = Cursor::new(combined);
        let mut archive = open_at(&mut cursor, 16).unwrap();
        let mut entries = archive.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str().unwrap(), "at-offset");
    }
}
