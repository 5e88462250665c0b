//! Discovery of container image tarballs that are loaded into the sandbox.

use std::{
    io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

/// Returns every file below `root` whose second dot separated name segment is
/// `tar`, e.g. `nginx.tar` or `app.tar.gz` but not `app.v1.tar`. The paths
/// include `root` and are sorted. `root` is created when it does not exist.
pub fn find_image_tarballs(root: &Path) -> io::Result<Vec<PathBuf>> {
    fs_err::create_dir_all(root)?;

    let mut found = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() && is_image_tarball(&entry.file_name().to_string_lossy()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    tracing::debug!("found {} image tarball(s) in {}", found.len(), root.display());
    Ok(found)
}

fn is_image_tarball(file_name: &str) -> bool {
    file_name.split('.').nth(1) == Some("tar")
}
