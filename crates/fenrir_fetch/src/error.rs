use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::{archive::ExtractError, http::NetworkError};

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Filesystem(#[from] std::io::Error),

    #[error("failed to extract '{member}' from '{}'", archive.display())]
    Extract {
        member: String,
        archive: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("no download source is configured for '{0}'")]
    #[diagnostic(help(
        "set a `url` for the artifact in the configuration, or place a valid copy in its directory"
    ))]
    MissingSource(String),

    #[error("failed to read the answer to the download prompt")]
    Prompt(#[source] std::io::Error),
}
