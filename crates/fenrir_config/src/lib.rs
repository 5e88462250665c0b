use std::{
    collections::{BTreeMap, BTreeSet as Set},
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::{ArgAction, Parser};
use fenrir_consts::consts;
use itertools::Itertools;
use miette::{IntoDiagnostic, miette};
use serde::Deserialize;
use url::Url;

#[derive(Parser, Debug, Default, Clone)]
pub struct ConfigCli {
    /// Download missing or invalid artifacts without asking.
    #[arg(long, short = 'y', global = true, env = "FENRIR_YES", action = ArgAction::SetTrue, help_heading = consts::CLAP_CONFIG_OPTIONS)]
    yes: bool,

    /// Do not verify the TLS certificate of the server.
    #[arg(long, global = true, action = ArgAction::SetTrue, help_heading = consts::CLAP_CONFIG_OPTIONS)]
    tls_no_verify: bool,
}

impl From<ConfigCli> for Config {
    fn from(cli: ConfigCli) -> Self {
        Self {
            assume_yes: cli.yes.then_some(true),
            tls_no_verify: cli.tls_no_verify.then_some(true),
            ..Config::default()
        }
    }
}

/// Overrides for a single artifact. For an artifact fenrir knows about, the
/// fields that are set replace the pinned ones. Any other name defines a new
/// artifact that is downloaded directly and needs both fields.
#[derive(Clone, Default, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ArtifactConfig {
    pub url: Option<Url>,
    /// Lowercase hex encoded SHA-256 of the artifact.
    pub checksum: Option<String>,
}

impl ArtifactConfig {
    pub fn merge_config(self, other: ArtifactConfig) -> Self {
        Self {
            url: other.url.or(self.url),
            checksum: other.checksum.or(self.checksum),
        }
    }
}

#[derive(Clone, Default, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Directory downloaded binaries are stored in.
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,

    /// Directory downloaded archives are stored in.
    #[serde(default)]
    pub tars_dir: Option<PathBuf>,

    /// Directory that is searched for container image tarballs.
    #[serde(default)]
    pub images_dir: Option<PathBuf>,

    /// Never ask before downloading.
    #[serde(default)]
    pub assume_yes: Option<bool>,

    #[serde(default)]
    pub tls_no_verify: Option<bool>,

    #[serde(default)]
    pub artifacts: BTreeMap<String, ArtifactConfig>,

    /// The files this configuration was read from.
    #[serde(skip)]
    pub loaded_from: Vec<PathBuf>,
}

#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum ConfigError {
    #[error("no file was found at {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read config from '{0}'")]
    ReadError(std::io::Error),
    #[error("failed to parse config of {1}: {0}")]
    ParseError(miette::Report, PathBuf),
    #[error("validation error of {1}: {0}")]
    ValidationError(miette::Report, PathBuf),
}

impl Config {
    /// Parses the configuration from a TOML string. Returns the keys that
    /// were not recognized alongside the configuration.
    pub fn from_toml(toml: &str) -> miette::Result<(Config, Set<String>)> {
        let de = toml_edit::de::Deserializer::from_str(toml).into_diagnostic()?;

        let mut unused_keys = Set::new();
        let config: Config = serde_ignored::deserialize(de, |path| {
            unused_keys.insert(path.to_string());
        })
        .into_diagnostic()?;

        Ok((config, unused_keys))
    }

    /// Loads a configuration file. Unknown keys are reported as warnings.
    pub fn from_path(path: &Path) -> Result<Config, ConfigError> {
        tracing::debug!("Loading config from {}", path.display());
        let s = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    || e.kind() == std::io::ErrorKind::NotADirectory =>
            {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::ReadError(e)),
        };

        let (mut config, unused_keys) =
            Config::from_toml(&s).map_err(|e| ConfigError::ParseError(e, path.to_path_buf()))?;

        if !unused_keys.is_empty() {
            tracing::warn!(
                "Ignoring '{}' in {}",
                console::style(unused_keys.iter().join(", ")).yellow(),
                console::style(path.display()).bold()
            );
        }

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e, path.to_path_buf()))?;

        config.loaded_from.push(path.to_path_buf());
        Ok(config)
    }

    /// Loads `fenrir.toml` from `dir`. A missing file is the default
    /// configuration.
    pub fn load(dir: &Path) -> Result<Config, ConfigError> {
        match Self::from_path(&dir.join(consts::CONFIG_FILE)) {
            Ok(config) => Ok(config),
            Err(ConfigError::FileNotFound(path)) => {
                tracing::debug!("No config file at {}, using the defaults", path.display());
                Ok(Config::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Validates every checksum in the configuration.
    pub fn validate(&self) -> miette::Result<()> {
        for (name, artifact) in &self.artifacts {
            if let Some(checksum) = &artifact.checksum {
                if !is_sha256_hex(checksum) {
                    return Err(miette!(
                        "the checksum of '{name}' must be 64 lowercase hex characters, got '{checksum}'"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Merges `other` into `self`, values set in `other` win.
    pub fn merge_config(mut self, mut other: Config) -> Self {
        other.loaded_from.extend(self.loaded_from);

        for (name, artifact) in other.artifacts {
            let merged = match self.artifacts.remove(&name) {
                Some(existing) => existing.merge_config(artifact),
                None => artifact,
            };
            self.artifacts.insert(name, merged);
        }

        Self {
            bin_dir: other.bin_dir.or(self.bin_dir),
            tars_dir: other.tars_dir.or(self.tars_dir),
            images_dir: other.images_dir.or(self.images_dir),
            assume_yes: other.assume_yes.or(self.assume_yes),
            tls_no_verify: other.tls_no_verify.or(self.tls_no_verify),
            artifacts: self.artifacts,
            loaded_from: other.loaded_from,
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.bin_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(consts::BIN_DIR))
    }

    pub fn tars_dir(&self) -> PathBuf {
        self.tars_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(consts::TARS_DIR))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.images_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(consts::IMAGES_DIR))
    }

    pub fn assume_yes(&self) -> bool {
        self.assume_yes.unwrap_or(false)
    }

    pub fn tls_no_verify(&self) -> bool {
        self.tls_no_verify.unwrap_or(false)
    }
}

fn is_sha256_hex(checksum: &str) -> bool {
    checksum.len() == 64
        && checksum
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
