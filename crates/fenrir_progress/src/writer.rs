use std::io::{self, Write};

use indicatif::MultiProgress;
use tracing_subscriber::fmt::MakeWriter;

/// Routes log output to stderr around the progress bars of a
/// [`MultiProgress`]. The bars are cleared before every write and redrawn
/// afterwards, so a log line never ends up inside a bar.
#[derive(Clone)]
pub struct IndicatifWriter {
    bars: MultiProgress,
}

impl IndicatifWriter {
    pub fn new(bars: MultiProgress) -> Self {
        Self { bars }
    }
}

impl Write for IndicatifWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A formatted event arrives in a single buffer, keep it in one piece.
        self.bars.suspend(|| io::stderr().lock().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl MakeWriter<'_> for IndicatifWriter {
    type Writer = IndicatifWriter;

    fn make_writer(&self) -> Self::Writer {
        self.clone()
    }
}
