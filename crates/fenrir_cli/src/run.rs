use clap::Parser;
use fenrir_config::Config;
use fenrir_fetch::FetchOutcome;
use fenrir_progress::status;
use fenrir_task::{TaskError, TaskInput, TaskOutput};
use miette::miette;

use crate::context::Context;

/// Run one of the artifacts, making sure it is present and valid first.
///
/// The artifact shares the terminal with fenrir. When it fails, fenrir exits
/// with its exit code.
#[derive(Parser, Debug)]
#[clap(trailing_var_arg = true)]
pub struct Args {
    /// The artifact to run.
    pub name: String,

    /// Arguments passed to the artifact.
    #[arg(allow_hyphen_values = true, num_args = 0..)]
    pub args: Vec<String>,
}

pub async fn execute(args: Args, config: Config) -> miette::Result<()> {
    let context = Context::new(config)?;
    let entry = context.entry(&args.name)?;

    let outcome = context
        .fetcher()
        .download(&entry.artifact, entry.options)
        .await?;
    if outcome == FetchOutcome::Skipped && !entry.artifact.path().is_file() {
        return Err(miette!(
            help = "run `fenrir fetch` to download it",
            "'{}' is not available",
            args.name
        ));
    }

    let task = entry
        .artifact
        .command()
        .args(&args.args)
        .stdin(TaskInput::Inherit)
        .stdout(TaskOutput::Inherit)
        .stderr(TaskOutput::Inherit)
        .build()?;
    tracing::debug!("running {task}");

    match task.run().await {
        Ok(_) => Ok(()),
        Err(TaskError::Execution { status: exit, .. }) => {
            status::err(format!("{} failed with {exit}", args.name));
            std::process::exit(exit.code().unwrap_or(1));
        }
        Err(err) => Err(err.into()),
    }
}
