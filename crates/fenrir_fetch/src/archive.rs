//! Pulls a single named member out of a tar stream, optionally gzip
//! compressed.

use std::{
    io::{self, Read, Write},
    path::Path,
};

use flate2::read::GzDecoder;
use miette::Diagnostic;
use tar::Archive;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("the archive has no member named '{member}'")]
    #[diagnostic(help("the member path has to match the entry in the archive exactly"))]
    MemberNotFound { member: String },
}

/// Extracts `member` from the archive file at `archive` into `destination`.
/// Returns the number of bytes written.
pub fn extract_file(
    archive: &Path,
    member: &str,
    gzip: bool,
    destination: &Path,
) -> Result<u64, ExtractError> {
    let file = fs_err::File::open(archive)?;
    extract_member(io::BufReader::new(file), member, gzip, destination)
}

/// Walks the entries of the tar stream in `reader` and streams the first
/// entry whose path equals `member` into `destination`, replacing whatever
/// was there.
///
/// The bytes are written to a temporary file next to `destination` first, so
/// nothing is created when the member is missing or the stream is corrupt.
pub fn extract_member<R: Read>(
    reader: R,
    member: &str,
    gzip: bool,
    destination: &Path,
) -> Result<u64, ExtractError> {
    if gzip {
        extract_from_tar(GzDecoder::new(reader), member, destination)
    } else {
        extract_from_tar(reader, member, destination)
    }
}

fn extract_from_tar<R: Read>(
    reader: R,
    member: &str,
    destination: &Path,
) -> Result<u64, ExtractError> {
    let mut archive = Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path_bytes().as_ref() != member.as_bytes() {
            continue;
        }

        tracing::debug!("found '{member}' in archive, writing {}", destination.display());
        let mut file = temp_file_for(destination)?;
        let written = io::copy(&mut entry, &mut file)?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(destination).map_err(|e| e.error)?;
        return Ok(written);
    }

    Err(ExtractError::MemberNotFound {
        member: member.to_string(),
    })
}

/// Builds a [`tempfile::NamedTempFile`] in the same directory as `path` so the
/// final rename stays on one filesystem.
pub(crate) fn temp_file_for(path: &Path) -> io::Result<tempfile::NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs_err::create_dir_all(dir)?;

    let prefix = format!(
        ".{}.",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("tmp")
    );
    tempfile::Builder::new().prefix(&prefix).tempfile_in(dir)
}
