//! Colored, symbolized status lines printed around every major step so an
//! operator can see which phase failed.

use std::fmt::{Display, Formatter};

use console::{Emoji, style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Ok,
    Warn,
    Err,
}

impl Status {
    fn symbol(self) -> Emoji<'static, 'static> {
        match self {
            Status::Info => Emoji("🟦 ", "[*] "),
            Status::Ok => Emoji("🟩 ", "[+] "),
            Status::Warn => Emoji("🟨 ", "[!] "),
            Status::Err => Emoji("🟥 ", "[x] "),
        }
    }
}

/// A single status line, rendered as `<symbol>[<message>]`.
pub struct StatusLine<M> {
    pub status: Status,
    pub message: M,
}

impl<M: Display> Display for StatusLine<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let body = format!("[{}]", self.message);
        let body = match self.status {
            Status::Info => style(body).blue(),
            Status::Ok => style(body).green(),
            Status::Warn => style(body).yellow(),
            Status::Err => style(body).red(),
        };
        write!(f, "{}{}", self.status.symbol(), body)
    }
}

pub fn print(status: Status, message: impl Display) {
    crate::println!("{}", StatusLine { status, message });
}

pub fn info(message: impl Display) {
    print(Status::Info, message)
}

pub fn ok(message: impl Display) {
    print(Status::Ok, message)
}

pub fn warn(message: impl Display) {
    print(Status::Warn, message)
}

pub fn err(message: impl Display) {
    print(Status::Err, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_wraps_message_in_brackets() {
        console::set_colors_enabled(false);
        let line = StatusLine {
            status: Status::Warn,
            message: "kubectl not found",
        }
        .to_string();
        assert!(line.ends_with("[kubectl not found]"), "{line}");
    }
}
