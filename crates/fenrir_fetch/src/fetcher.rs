use std::{
    io::{self, Write},
    path::Path,
    sync::Arc,
};

use fenrir_consts::consts;
use fenrir_progress::{download_progress_bar, status};
use futures::StreamExt;
use url::Url;

use crate::{
    archive::{self, temp_file_for},
    checksum,
    error::FetchError,
    http::{HttpClient, NetworkError},
    prompt::Prompt,
    Artifact, FetchOptions,
};

/// What [`Fetcher::download`] did to materialize an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A copy with the expected checksum was already present.
    Verified,
    /// The user declined the download. Nothing was changed on disk.
    Skipped,
    /// The artifact was downloaded (and extracted).
    Downloaded {
        /// Number of bytes received over the network.
        bytes: u64,
        /// Checksum of the artifact file after the download. This is not
        /// compared with the expected checksum.
        checksum: String,
    },
}

impl FetchOutcome {
    pub fn bytes_transferred(&self) -> u64 {
        match self {
            FetchOutcome::Downloaded { bytes, .. } => *bytes,
            FetchOutcome::Verified | FetchOutcome::Skipped => 0,
        }
    }
}

/// Makes sure artifacts exist on disk with their expected checksum.
///
/// A fetcher is created once and shared by everything that needs an
/// artifact.
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    prompt: Arc<dyn Prompt>,
}

impl Fetcher {
    pub fn new(client: Arc<dyn HttpClient>, prompt: Arc<dyn Prompt>) -> Self {
        Self { client, prompt }
    }

    /// Ensures `artifact` is present and valid.
    ///
    /// An existing file with the expected checksum is trusted without any
    /// network traffic. A missing file or a checksum mismatch asks the user
    /// before downloading; declining is not an error.
    pub async fn download(
        &self,
        artifact: &Artifact,
        options: FetchOptions,
    ) -> Result<FetchOutcome, FetchError> {
        let path = artifact.path();
        let name = consts::ARTIFACT_STYLE.apply_to(&artifact.name);

        match fs_err::metadata(&path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                status::warn(format!("{name} not found"));
            }
            Err(err) => return Err(err.into()),
            Ok(_) => {
                if checksum::is_valid_checksum(&path, &artifact.checksum)? {
                    if options.verbose {
                        status::ok(format!("{name} found"));
                    }
                    return Ok(FetchOutcome::Verified);
                }
                tracing::debug!(
                    "checksum of {} does not match {}",
                    path.display(),
                    artifact.checksum
                );
                status::warn(format!("invalid {name} checksum"));
            }
        }

        if !self
            .prompt
            .should_download(&artifact.name)
            .map_err(FetchError::Prompt)?
        {
            tracing::info!("skipping the download of {}", artifact.name);
            return Ok(FetchOutcome::Skipped);
        }

        self.fetch(artifact, options).await
    }

    async fn fetch(
        &self,
        artifact: &Artifact,
        options: FetchOptions,
    ) -> Result<FetchOutcome, FetchError> {
        let path = artifact.path();

        let bytes = match (&artifact.archive, options.from_archive) {
            (Some(tarball), true) => {
                let archive_path = tarball.path();
                let bytes = self.stream_to_file(&tarball.url, &archive_path).await?;

                status::info(format!(
                    "extracting file {} to {}",
                    tarball.member,
                    consts::PATH_STYLE.apply_to(path.display())
                ));
                match archive::extract_file(
                    &archive_path,
                    &tarball.member,
                    options.gzip_compressed,
                    &path,
                ) {
                    Ok(written) => {
                        tracing::debug!("extracted {written} bytes");
                        status::ok("extraction done");
                    }
                    Err(source) => {
                        status::err("extraction failed");
                        return Err(FetchError::Extract {
                            member: tarball.member.clone(),
                            archive: archive_path,
                            source,
                        });
                    }
                }
                bytes
            }
            _ => {
                let url = artifact
                    .url
                    .as_ref()
                    .ok_or_else(|| FetchError::MissingSource(artifact.name.clone()))?;
                self.stream_to_file(url, &path).await?
            }
        };
        make_executable(&path)?;

        let checksum = checksum::sha256_file(&path)?;
        status::info(format!(
            "{} sum: {}",
            artifact.name,
            consts::CHECKSUM_STYLE.apply_to(&checksum)
        ));

        Ok(FetchOutcome::Downloaded { bytes, checksum })
    }

    /// Streams the body of `url` into `target` and returns the number of
    /// bytes received. The body is written to a temporary file that only
    /// replaces `target` once the stream has ended, so an interrupted
    /// transfer leaves `target` untouched.
    async fn stream_to_file(&self, url: &Url, target: &Path) -> Result<u64, FetchError> {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());

        let download = self.client.get(url).await?;
        let mut file = temp_file_for(target)?;

        let pb = download_progress_bar(file_name.clone(), download.content_length);
        let mut body = download.body;
        let mut total = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(source) => {
                    pb.abandon();
                    status::err(format!("{file_name} download failed"));
                    return Err(NetworkError::Transfer {
                        url: url.clone(),
                        source,
                    }
                    .into());
                }
            };
            if chunk.is_empty() {
                continue;
            }
            file.write_all(&chunk)?;
            total += chunk.len() as u64;
            pb.set_position(total);
        }
        pb.finish_and_clear();

        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(target).map_err(|e| e.error)?;

        status::ok(format!("{file_name} download finished ({total} bytes)"));
        Ok(total)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs_err::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
