pub mod status;
mod writer;

use std::{fmt::Write, sync::LazyLock};

use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressState};
pub use writer::IndicatifWriter;

/// A helper macro to print a message to the console. If a multi-progress bar
/// is currently active, this macro will suspend the progress bar, print the
/// message and continue the progress bar. This ensures the output does not
/// interfere with the progress bar.
///
/// If the progress bar is hidden, the message will be printed to `stderr`
/// instead.
#[macro_export]
macro_rules! println {
    () => {
        let mp = $crate::global_multi_progress();
        if mp.is_hidden() {
            eprintln!();
        } else {
            // Ignore any error
            let _err = mp.println("");
        }
    };
    ($($arg:tt)*) => {
        let mp = $crate::global_multi_progress();
        if mp.is_hidden() {
            eprintln!($($arg)*);
        } else {
            // Ignore any error
            let _err = mp.println(format!($($arg)*));
        }
    }
}

/// Returns a global instance of [`indicatif::MultiProgress`].
///
/// Every progress bar fenrir draws is added to this instance, and logging is
/// routed through [`IndicatifWriter`] so log lines never tear a bar in half.
pub fn global_multi_progress() -> MultiProgress {
    static GLOBAL_MP: LazyLock<MultiProgress> = LazyLock::new(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
        mp
    });
    GLOBAL_MP.clone()
}

/// Filled and unfilled segments of a progress bar.
const PROGRESS_CHARS: &str = "━━╾─";

/// Spinner frames of a download whose size is unknown.
const SPINNER_CHARS: &str = "⠁⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋⠉⠈⠈ ";

fn smoothed_bytes_per_sec(s: &ProgressState, w: &mut dyn Write) {
    match (s.pos(), s.elapsed().as_millis()) {
        (pos, elapsed_ms) if elapsed_ms > 0 => {
            let _ = write!(
                w,
                "{}/s",
                HumanBytes((pos as f64 * 1000_f64 / elapsed_ms as f64) as u64)
            );
        }
        _ => {
            let _ = write!(w, "-");
        }
    }
}

/// Returns the style to use for a download whose size is known up front.
pub fn default_bytes_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::default_bar()
        .template("  {spinner:.dim} {prefix:20!} [{elapsed_precise}] [{bar:20!.bright.yellow/dim.white}] {bytes:>8} @ {smoothed_bytes_per_sec:8}")
        .expect("failed to set a progress bar template")
        .progress_chars(PROGRESS_CHARS)
        .with_key("smoothed_bytes_per_sec", smoothed_bytes_per_sec)
}

/// Returns the style to use for a download that did not announce its size.
/// Only the running byte count is shown.
pub fn unknown_length_bytes_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::default_spinner()
        .template("  {spinner:.dim} {prefix:20!} [{elapsed_precise}] Downloaded: {bytes:>8} @ {smoothed_bytes_per_sec:8}")
        .expect("failed to set a progress bar template")
        .tick_chars(SPINNER_CHARS)
        .with_key("smoothed_bytes_per_sec", smoothed_bytes_per_sec)
}

/// Adds a byte counting progress bar for a download to the global
/// multi-progress. When `length` is `None` the bar only counts.
pub fn download_progress_bar(prefix: impl Into<String>, length: Option<u64>) -> ProgressBar {
    let pb = match length {
        Some(len) => ProgressBar::new(len).with_style(default_bytes_style()),
        None => ProgressBar::no_length().with_style(unknown_length_bytes_style()),
    };
    let pb = global_multi_progress().add(pb);
    pb.set_prefix(prefix.into());
    pb
}
