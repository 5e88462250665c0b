//! The confirmation gate in front of every download.

use std::io::{self, BufRead, BufReader, Stdin};

use fenrir_progress::{
    global_multi_progress,
    status::{Status, StatusLine},
};
use parking_lot::Mutex;

pub trait Prompt: Send + Sync {
    /// Asks whether the artifact `name` should be downloaded.
    fn should_download(&self, name: &str) -> io::Result<bool>;
}

/// Reads the answer as one line of input. Every answer except the literal `n`
/// is a yes, including an empty line and the end of the input.
pub struct LinePrompt<R> {
    input: Mutex<R>,
}

impl<R: BufRead + Send> LinePrompt<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }
}

impl LinePrompt<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead + Send> Prompt for LinePrompt<R> {
    fn should_download(&self, name: &str) -> io::Result<bool> {
        let mut input = self.input.lock();
        global_multi_progress().suspend(|| -> io::Result<bool> {
            eprint!(
                "{}: ",
                StatusLine {
                    status: Status::Info,
                    message: format!("Download {name}? (y/n)"),
                }
            );
            let mut line = Vec::new();
            input.read_until(b'\n', &mut line)?;
            Ok(is_acceptance(&line))
        })
    }
}

/// Accepts every download without asking. Used when running
/// non-interactively.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn should_download(&self, name: &str) -> io::Result<bool> {
        tracing::info!("downloading {name} without asking");
        Ok(true)
    }
}

/// The answer is compared as raw bytes, input that is not valid UTF-8 is a
/// yes like any other answer.
fn is_acceptance(line: &[u8]) -> bool {
    let answer = line
        .strip_suffix(b"\n")
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .unwrap_or(line);
    answer != b"n"
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::empty_line("\n", true)]
    #[case::end_of_input("", true)]
    #[case::yes("y\n", true)]
    #[case::literal_no("n\n", false)]
    #[case::literal_no_crlf("n\r\n", false)]
    #[case::literal_no_without_newline("n", false)]
    #[case::spelled_out_no("no\n", true)]
    #[case::uppercase_no("N\n", true)]
    #[case::padded_no(" n\n", true)]
    fn only_a_literal_n_declines(#[case] input: &str, #[case] accepted: bool) {
        let prompt = LinePrompt::new(Cursor::new(input.as_bytes().to_vec()));
        assert_eq!(prompt.should_download("tool").unwrap(), accepted);
    }

    #[rstest]
    #[case::invalid_utf8(&[0xff, 0xfe, b'\n'][..])]
    #[case::invalid_utf8_without_newline(&[0xc3][..])]
    #[case::n_followed_by_invalid_byte(&[b'n', 0xff, b'\n'][..])]
    fn non_utf8_answers_are_accepted(#[case] input: &[u8]) {
        let prompt = LinePrompt::new(Cursor::new(input.to_vec()));
        assert!(prompt.should_download("tool").unwrap());
    }

    #[test]
    fn reads_one_answer_per_question() {
        let prompt = LinePrompt::new(Cursor::new(b"n\ny\n".to_vec()));
        assert!(!prompt.should_download("minikube").unwrap());
        assert!(prompt.should_download("kubectl").unwrap());
    }
}
