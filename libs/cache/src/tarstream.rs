//! Directory ↔ tar byte-stream conversion for the artifact protocol.

use std::fs;
use std::io;
use std::path::Path;

use tar::{Archive, Builder};

/// Packs a directory tree into an uncompressed tar stream. Entries are
/// added in sorted order so equal trees produce equal bytes.
pub fn pack(dir: &Path) -> io::Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    builder.follow_symlinks(false);
    append_dir(&mut builder, dir, dir)?;
    builder.into_inner()
}

fn append_dir(builder: &mut Builder<Vec<u8>>, base: &Path, dir: &Path) -> io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let rel = path
            .strip_prefix(base)
            .map_err(|e| io::Error::other(e.to_string()))?;
        if entry.file_type()?.is_dir() {
            builder.append_dir(rel, &path)?;
            append_dir(builder, base, &path)?;
        } else {
            builder.append_path_with_name(&path, rel)?;
        }
    }
    Ok(())
}

/// Unpacks a tar stream into an existing directory. Entries that would
/// escape the destination are rejected by the archive reader.
pub fn unpack(bytes: &[u8], dest: &Path) -> io::Result<()> {
    let mut archive = Archive::new(bytes);
    archive.set_overwrite(true);
    archive.unpack(dest)
}
