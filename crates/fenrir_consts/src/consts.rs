use console::Style;
use std::sync::LazyLock;

pub const FENRIR_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CONFIG_FILE: &str = "fenrir.toml";

/// Directory (relative to the working directory) that downloaded binaries land in.
pub const BIN_DIR: &str = "bin";
/// Directory (relative to the working directory) that downloaded archives land in.
pub const TARS_DIR: &str = "tars";
/// Directory (relative to the working directory) that is searched for image tarballs.
pub const IMAGES_DIR: &str = "images";

pub const CLAP_CONFIG_OPTIONS: &str = "Config Options";
pub const CLAP_GLOBAL_OPTIONS: &str = "Global Options";

// Cluster manager
pub const MINIKUBE_EXE_NAME: &str = "minikube";
pub const MINIKUBE_VERSION: &str = "v1.36.0";
pub const MINIKUBE_CHECKSUM: &str =
    "cddeab5ab86ab98e4900afac9d62384dae0941498dfbe712ae0c8868250bc3d7";

// Configuration-apply client
pub const KUBECTL_EXE_NAME: &str = "kubectl";
pub const KUBECTL_VERSION: &str = "v1.33.0";
pub const KUBECTL_CHECKSUM: &str =
    "9efe8d3facb23e1618cba36fb1c4e15ac9dc3ed5a2c2e18109e4a66b2bac12dc";

// Chart installer, only distributed as a gzipped tarball
pub const HELM_EXE_NAME: &str = "helm";
pub const HELM_VERSION: &str = "v3.18.6";
pub const HELM_CHECKSUM: &str = "c153fd9c1173f39aefe8e9aa9f00fd3daf6b40c8ea01e94a0d2f2c1787fc60e0";
pub const HELM_TAR_MEMBER: &str = "linux-amd64/helm";

pub fn minikube_url() -> String {
    format!(
        "https://github.com/kubernetes/minikube/releases/download/{MINIKUBE_VERSION}/minikube-linux-amd64"
    )
}

pub fn kubectl_url() -> String {
    format!("https://dl.k8s.io/release/{KUBECTL_VERSION}/bin/linux/amd64/kubectl")
}

pub fn helm_tar_name() -> String {
    format!("helm-{HELM_VERSION}-linux-amd64.tar.gz")
}

pub fn helm_url() -> String {
    format!("https://get.helm.sh/{}", helm_tar_name())
}

pub static ARTIFACT_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().blue());
pub static CHECKSUM_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().dim());
pub static PATH_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().bold());
