//! SHA-256 checksums of files on disk, hex encoded in lowercase.

use std::{io, path::Path};

use sha2::{Digest, Sha256};

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = fs_err::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Returns true if the checksum of the file equals `expected` exactly.
pub fn is_valid_checksum(path: &Path, expected: &str) -> io::Result<bool> {
    Ok(sha256_file(path)? == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello");
        fs_err::write(&path, "hello\n").unwrap();

        let expected = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";
        assert_eq!(sha256_file(&path).unwrap(), expected);
        assert!(is_valid_checksum(&path, expected).unwrap());
        assert!(!is_valid_checksum(&path, &expected.to_uppercase()).unwrap());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sha256_file(&dir.path().join("missing")).is_err());
    }
}
