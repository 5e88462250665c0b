//! The pinned set of binaries a sandbox needs.

use std::path::Path;

use fenrir_consts::consts;
use url::Url;

use crate::{ArchiveSource, Artifact, FetchOptions};

/// An artifact together with the options it is fetched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub artifact: Artifact,
    pub options: FetchOptions,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        &self.artifact.name
    }
}

/// The cluster manager, the configuration-apply client and the chart
/// installer, in the order they are fetched.
pub fn default_catalog(bin_dir: &Path, tars_dir: &Path) -> Result<Vec<CatalogEntry>, url::ParseError> {
    let minikube = Artifact::new(consts::MINIKUBE_EXE_NAME, bin_dir, consts::MINIKUBE_CHECKSUM)
        .with_url(Url::parse(&consts::minikube_url())?);

    let kubectl = Artifact::new(consts::KUBECTL_EXE_NAME, bin_dir, consts::KUBECTL_CHECKSUM)
        .with_url(Url::parse(&consts::kubectl_url())?);

    let helm = Artifact::new(consts::HELM_EXE_NAME, bin_dir, consts::HELM_CHECKSUM).with_archive(
        ArchiveSource {
            name: consts::helm_tar_name(),
            dest: tars_dir.to_path_buf(),
            url: Url::parse(&consts::helm_url())?,
            member: consts::HELM_TAR_MEMBER.to_string(),
        },
    );

    Ok(vec![
        CatalogEntry {
            artifact: minikube,
            options: FetchOptions::verbose(),
        },
        CatalogEntry {
            artifact: kubectl,
            options: FetchOptions::verbose(),
        },
        CatalogEntry {
            artifact: helm,
            options: FetchOptions::verbose().with_archive(true),
        },
    ])
}
