use std::{collections::BTreeMap, path::Path, sync::Arc};

use fenrir_config::{ArtifactConfig, Config};
use fenrir_fetch::{
    Artifact, FetchOptions, Fetcher,
    catalog::{CatalogEntry, default_catalog},
    http::ReqwestClient,
    prompt::{AssumeYes, LinePrompt, Prompt},
};
use itertools::Itertools;
use miette::{IntoDiagnostic, miette};

/// Everything a command needs, built once per invocation and handed out by
/// reference.
pub struct Context {
    fetcher: Fetcher,
    catalog: Vec<CatalogEntry>,
}

impl Context {
    pub fn new(config: Config) -> miette::Result<Self> {
        let client = ReqwestClient::new(config.tls_no_verify())?;
        let prompt: Arc<dyn Prompt> = if config.assume_yes() {
            Arc::new(AssumeYes)
        } else {
            Arc::new(LinePrompt::stdin())
        };

        let catalog = default_catalog(&config.bin_dir(), &config.tars_dir()).into_diagnostic()?;
        let catalog = apply_overrides(catalog, &config.artifacts, &config.bin_dir())?;

        Ok(Self {
            fetcher: Fetcher::new(Arc::new(client), prompt),
            catalog,
        })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Looks up an artifact by name.
    pub fn entry(&self, name: &str) -> miette::Result<&CatalogEntry> {
        self.catalog
            .iter()
            .find(|entry| entry.name() == name)
            .ok_or_else(|| {
                miette!(
                    help = format!(
                        "known artifacts are {}",
                        self.catalog.iter().map(CatalogEntry::name).join(", ")
                    ),
                    "unknown artifact '{name}'"
                )
            })
    }
}

/// Applies the `[artifacts]` table of the configuration to the catalog.
///
/// A `url` on a known artifact turns it into a direct download, even if it was
/// fetched through a tarball before. Unknown names are appended as direct
/// downloads and need both a `url` and a `checksum`.
pub fn apply_overrides(
    mut catalog: Vec<CatalogEntry>,
    overrides: &BTreeMap<String, ArtifactConfig>,
    bin_dir: &Path,
) -> miette::Result<Vec<CatalogEntry>> {
    for (name, config) in overrides {
        if let Some(entry) = catalog.iter_mut().find(|entry| entry.name() == name) {
            if let Some(url) = &config.url {
                tracing::debug!("downloading {name} from {url}");
                entry.artifact.url = Some(url.clone());
                entry.options.from_archive = false;
                entry.options.gzip_compressed = false;
            }
            if let Some(checksum) = &config.checksum {
                entry.artifact.checksum = checksum.clone();
            }
            continue;
        }

        let (Some(url), Some(checksum)) = (&config.url, &config.checksum) else {
            return Err(miette!(
                help = "artifacts that fenrir does not know need both a `url` and a `checksum`",
                "the configuration of '{name}' is incomplete"
            ));
        };
        catalog.push(CatalogEntry {
            artifact: Artifact::new(name.as_str(), bin_dir, checksum.as_str()).with_url(url.clone()),
            options: FetchOptions::verbose(),
        });
    }
    Ok(catalog)
}
