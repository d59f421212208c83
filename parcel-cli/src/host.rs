//! Terminal implementation of [`JobHost`].

use std::io::Write;
use std::sync::Mutex;

use parcel_core::JobHost;
use tokio_util::sync::CancellationToken;

/// Reports job messages as lines on a stream, usually standard error.
///
/// Cancellation follows the token that the interrupt handler fires.
pub(crate) struct StreamHost<W: Write> {
    stream: Mutex<W>,
    cancel: CancellationToken,
}

impl<W: Write> StreamHost<W> {
    pub(crate) const fn new(stream: W, cancel: CancellationToken) -> Self {
        Self {
            stream: Mutex::new(stream),
            cancel,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        match self.stream.into_inner() {
            Ok(stream) => stream,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn line(&self, text: &str) {
        if let Ok(mut stream) = self.stream.lock() {
            // Progress output is best effort.
            let _ = writeln!(stream, "{text}");
        }
    }
}

impl<W: Write> JobHost for StreamHost<W> {
    fn report_progress(&self, percent: u8) {
        self.line(&format!("progress: {percent}%"));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn report_error(&self, message: &str, fatal: bool) {
        let label = if fatal { "error" } else { "warning" };
        self.line(&format!("{label}: {message}"));
    }

    fn report_info(&self, message: &str) {
        self.line(message);
    }
}
