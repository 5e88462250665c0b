use std::{ffi::OsString, path::PathBuf};

use fenrir_task::{RunOutput, TaskBuilder, TaskError, TaskInput};
use url::Url;

/// A binary fenrir depends on, e.g. the cluster manager.
///
/// `name` joined onto `dest` is the path the artifact lives at. The artifact
/// is downloaded from `url`, or from `archive` when the fetch options ask for
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub dest: PathBuf,
    /// Lowercase hex encoded SHA-256 of the file.
    pub checksum: String,
    pub url: Option<Url>,
    pub archive: Option<ArchiveSource>,
}

/// A tarball that carries an artifact as one of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    /// File name of the downloaded tarball.
    pub name: String,
    pub dest: PathBuf,
    pub url: Url,
    /// The exact path of the artifact inside the tarball. No pattern matching
    /// is performed.
    pub member: String,
}

impl ArchiveSource {
    pub fn path(&self) -> PathBuf {
        self.dest.join(&self.name)
    }
}

/// Independent switches that control how an artifact is fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Also report when an artifact is already present and valid.
    pub verbose: bool,
    /// Fetch the artifact through its [`ArchiveSource`].
    pub from_archive: bool,
    /// The archive is gzip compressed.
    pub gzip_compressed: bool,
}

impl FetchOptions {
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    pub fn with_archive(self, gzip_compressed: bool) -> Self {
        Self {
            from_archive: true,
            gzip_compressed,
            ..self
        }
    }
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        dest: impl Into<PathBuf>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dest: dest.into(),
            checksum: checksum.into(),
            url: None,
            archive: None,
        }
    }

    pub fn with_url(self, url: Url) -> Self {
        Self {
            url: Some(url),
            ..self
        }
    }

    pub fn with_archive(self, archive: ArchiveSource) -> Self {
        Self {
            archive: Some(archive),
            ..self
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dest.join(&self.name)
    }

    /// Returns a task builder that runs this artifact.
    pub fn command(&self) -> TaskBuilder {
        TaskBuilder::new(self.path())
    }

    /// Runs the artifact with the given arguments and input and returns its
    /// captured output.
    pub async fn run<I, S>(&self, args: I, input: TaskInput) -> Result<RunOutput, TaskError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.command().args(args).stdin(input).build()?.run().await
    }
}
