//! Verified acquisition of the external binaries fenrir drives.
//!
//! A [`Fetcher`] makes sure an [`Artifact`] exists on disk with the expected
//! SHA-256 checksum. When it is missing or does not match, the user is asked
//! for confirmation and the artifact is downloaded, either directly or by
//! pulling a single member out of a (gzip-compressed) tarball.
#![deny(clippy::dbg_macro)]

pub mod archive;
mod artifact;
pub mod catalog;
pub mod checksum;
mod error;
mod fetcher;
pub mod http;
pub mod images;
pub mod prompt;

pub use artifact::{ArchiveSource, Artifact, FetchOptions};
pub use error::FetchError;
pub use fetcher::{FetchOutcome, Fetcher};
