use clap::Parser;
use fenrir_config::Config;
use fenrir_fetch::FetchOutcome;
use fenrir_progress::status;
use indicatif::HumanBytes;

use crate::context::Context;

/// Download the binaries the sandbox needs, verifying their checksums.
#[derive(Parser, Debug)]
pub struct Args {
    /// The artifacts to fetch, all of them when empty.
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,
}

pub async fn execute(args: Args, config: Config) -> miette::Result<()> {
    let context = Context::new(config)?;

    let entries = if args.names.is_empty() {
        context.catalog().iter().collect::<Vec<_>>()
    } else {
        args.names
            .iter()
            .map(|name| context.entry(name))
            .collect::<miette::Result<Vec<_>>>()?
    };

    let mut transferred = 0;
    let mut skipped = Vec::new();
    for entry in entries {
        let outcome = context
            .fetcher()
            .download(&entry.artifact, entry.options)
            .await?;
        if outcome == FetchOutcome::Skipped {
            skipped.push(entry.name());
        }
        transferred += outcome.bytes_transferred();
    }

    if transferred > 0 {
        status::ok(format!("downloaded {}", HumanBytes(transferred)));
    }
    if !skipped.is_empty() {
        status::warn(format!("skipped {}", skipped.join(", ")));
    }
    Ok(())
}
