//! # Fenrir CLI
//!
//! This module implements the CLI interface of fenrir.
//!
//! ## Structure
//!
//! - The [`Command`] enum defines the top-level commands available.
//! - The [`execute_command`] function matches on [`Command`] and calls the corresponding logic.
#![deny(clippy::dbg_macro)]

use clap::Parser;
use clap::builder::styling::{AnsiColor, Color, Style};
use fenrir_config::{Config, ConfigCli};
use fenrir_consts::consts;
use fenrir_progress::global_multi_progress;
use indicatif::ProgressDrawTarget;
use miette::IntoDiagnostic;

use std::{env, io::IsTerminal};
use tracing::level_filters::LevelFilter;

pub mod context;
pub mod fetch;
pub mod images;
pub mod run;

#[derive(Parser, Debug)]
#[command(
    name = "fenrir",
    version(consts::FENRIR_VERSION),
    about = format!("
Fenrir [version {}] - Provisions a local Kubernetes sandbox.

Fenrir keeps the cluster manager, the configuration-apply client and the chart
installer in a local directory, verified by their SHA-256 checksums.

Basic Usage:
    Download everything the sandbox needs:
    $ fenrir fetch

    Run one of the downloaded tools:
    $ fenrir run kubectl get pods
", consts::FENRIR_VERSION),
)]
#[clap(arg_required_else_help = true, styles=get_styles())]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    #[clap(flatten)]
    global_options: GlobalOptions,
}

#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// More log output, repeat for more detail (-v warnings, -vv info, -vvv debug, -vvvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help_heading = consts::CLAP_GLOBAL_OPTIONS)]
    verbose: u8,

    /// Less log output, a single -q silences logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help_heading = consts::CLAP_GLOBAL_OPTIONS)]
    quiet: u8,

    /// When to color the output
    #[arg(long, global = true, value_enum, default_value_t, env = "FENRIR_COLOR", help_heading = consts::CLAP_GLOBAL_OPTIONS)]
    color: ColorOutput,

    /// Do not draw progress bars. Implied when stderr is not a terminal.
    #[arg(long, global = true, env = "FENRIR_NO_PROGRESS", help_heading = consts::CLAP_GLOBAL_OPTIONS)]
    no_progress: bool,

    #[command(flatten)]
    config: ConfigCli,
}

impl Args {
    fn no_progress(&self) -> bool {
        self.global_options.no_progress || !std::io::stderr().is_terminal()
    }

    /// `-q` silences everything, otherwise every `-v` lowers the threshold by
    /// one level starting at errors.
    fn log_level_filter(&self) -> LevelFilter {
        if self.global_options.quiet > 0 {
            return LevelFilter::OFF;
        }
        match self.global_options.verbose {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
pub enum Command {
    #[clap(visible_alias = "f")]
    Fetch(fetch::Args),
    Images(images::Args),
    #[clap(visible_alias = "r")]
    Run(run::Args),
}

pub async fn execute() -> miette::Result<()> {
    let args = Args::parse();

    let no_progress = args.no_progress();

    set_console_colors(&args);

    let use_colors = console::colors_enabled_stderr();
    let in_ci = matches!(env::var("CI").as_deref(), Ok("1" | "true"));
    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::default()
                .color(use_colors)
                // Don't wrap lines in CI environments to avoid breaking logs.
                .wrap_lines(!in_ci)
                .build(),
        )
    }))?;

    // Hide all progress bars if the user requested it.
    if no_progress {
        global_multi_progress().set_draw_target(ProgressDrawTarget::hidden());
    }

    setup_logging(&args, use_colors)?;

    execute_command(args.command, args.global_options).await
}

fn setup_logging(args: &Args, use_colors: bool) -> miette::Result<()> {
    use fenrir_progress::IndicatifWriter;
    use tracing_subscriber::{
        EnvFilter, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
    };

    let (level_filter, fenrir_level) = log_levels(args.log_level_filter());

    // CLI verbosity flags take precedence over RUST_LOG.
    let cli_verbosity_set = args.global_options.verbose > 0 || args.global_options.quiet > 0;
    let directives = fenrir_directives(fenrir_level);
    let env_filter = if cli_verbosity_set {
        EnvFilter::builder()
            .with_default_directive(level_filter.into())
            .parse(directives)
            .into_diagnostic()?
    } else {
        let env_directives = env::var("RUST_LOG").unwrap_or_default();
        let final_directives = if env_directives.is_empty() {
            directives
        } else {
            format!("{directives},{env_directives}")
        };

        EnvFilter::builder()
            .with_default_directive(level_filter.into())
            .parse(&final_directives)
            .into_diagnostic()?
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(use_colors)
        .with_target(fenrir_level >= LevelFilter::INFO)
        .with_writer(IndicatifWriter::new(global_multi_progress()))
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
    Ok(())
}

/// Returns the level for dependencies and the level for the fenrir crates,
/// which are always one step more verbose.
fn log_levels(filter: LevelFilter) -> (LevelFilter, LevelFilter) {
    match filter {
        LevelFilter::OFF => (LevelFilter::OFF, LevelFilter::OFF),
        LevelFilter::ERROR => (LevelFilter::ERROR, LevelFilter::WARN),
        LevelFilter::WARN => (LevelFilter::WARN, LevelFilter::INFO),
        LevelFilter::INFO => (LevelFilter::INFO, LevelFilter::DEBUG),
        LevelFilter::DEBUG => (LevelFilter::DEBUG, LevelFilter::TRACE),
        LevelFilter::TRACE => (LevelFilter::TRACE, LevelFilter::TRACE),
    }
}

fn fenrir_directives(level: LevelFilter) -> String {
    ["fenrir", "fenrir_cli", "fenrir_config", "fenrir_fetch", "fenrir_task"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Maps command enum variants to their actual function handlers.
pub async fn execute_command(command: Command, global_options: GlobalOptions) -> miette::Result<()> {
    let cwd = env::current_dir().into_diagnostic()?;
    let config = Config::load(&cwd)?.merge_config(global_options.config.into());

    match command {
        Command::Fetch(cmd) => fetch::execute(cmd, config).await,
        Command::Images(cmd) => images::execute(cmd, config),
        Command::Run(cmd) => run::execute(cmd, config).await,
    }
}

/// When to color the output. `Auto` leaves the decision to `console`, which
/// looks at the terminal and `NO_COLOR`.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorOutput {
    Always,
    Never,
    #[default]
    Auto,
}

impl ColorOutput {
    /// `FORCE_COLOR` and `NO_COLOR` beat the flag and `FENRIR_COLOR`.
    fn resolve(self) -> Self {
        if env::var_os("FORCE_COLOR").is_some() {
            ColorOutput::Always
        } else if env::var_os("NO_COLOR").is_some() {
            ColorOutput::Never
        } else {
            self
        }
    }
}

fn set_console_colors(args: &Args) {
    let enabled = match args.global_options.color.resolve() {
        ColorOutput::Always => true,
        ColorOutput::Never => false,
        ColorOutput::Auto => return,
    };
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

pub fn get_styles() -> clap::builder::Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::BrightBlue)));
    let literal = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightCyan)));
    let error = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    clap::builder::Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(literal)
        .placeholder(literal)
        .invalid(error)
        .error(error)
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
}
