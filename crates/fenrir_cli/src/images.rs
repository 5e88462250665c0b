use std::path::PathBuf;

use clap::Parser;
use fenrir_config::Config;
use fenrir_fetch::images::find_image_tarballs;
use miette::IntoDiagnostic;

/// List the container image tarballs that are loaded into the sandbox.
#[derive(Parser, Debug)]
pub struct Args {
    /// Directory to search instead of the configured images directory.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

pub fn execute(args: Args, config: Config) -> miette::Result<()> {
    let root = args.dir.unwrap_or_else(|| config.images_dir());
    let tarballs = find_image_tarballs(&root).into_diagnostic()?;

    if tarballs.is_empty() {
        tracing::info!("no image tarballs found in {}", root.display());
    }
    for tarball in tarballs {
        println!("{}", tarball.display());
    }
    Ok(())
}
