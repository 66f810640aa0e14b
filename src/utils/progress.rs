//! Progress reporting for downloads and file copies
//!
//! Byte streams are wrapped in a [`ProgressReader`], an [`AsyncRead`]
//! decorator that counts bytes as they pass through and notifies a
//! [`ProgressObserver`]. Observers come from a [`ProgressSink`], so the code
//! that moves bytes never writes to the terminal itself:
//!
//! - [`TerminalProgressSink`] draws `indicatif` bars on stderr
//! - [`NoProgress`] discards every update
//!
//! # Environment Variables
//!
//! - `BURROW_NO_PROGRESS`: set to any value to hide all progress bars
//!
//! # Examples
//!
//! ```rust,no_run
//! use burrow::utils::progress::{ProgressReader, ProgressSink, TerminalProgressSink};
//!
//! # async fn example(file: tokio::fs::File, len: u64) -> std::io::Result<()> {
//! let sink = TerminalProgressSink::new(true);
//! let mut reader = ProgressReader::new(file, len, sink.start("Downloading", len));
//! let mut out = tokio::io::sink();
//! tokio::io::copy(&mut reader, &mut out).await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use tokio::io::{AsyncRead, ReadBuf};

/// Minimum advance, in percentage points, between two observer updates.
pub const REDRAW_THRESHOLD: u8 = 1;

/// Receives progress notifications for a single transfer.
pub trait ProgressObserver: Send {
    /// Called whenever the completed percentage advances by at least
    /// [`REDRAW_THRESHOLD`]. `percent` never exceeds 100.
    fn update(&mut self, done: u64, total: u64, percent: u8);

    /// Called once when the underlying stream reaches EOF.
    fn finish(&mut self);
}

/// Factory for per-transfer observers.
pub trait ProgressSink: Send + Sync {
    /// Begin reporting a transfer of `total` bytes labelled `label`.
    fn start(&self, label: &str, total: u64) -> Box<dyn ProgressObserver>;
}

/// Check whether progress bars are disabled via the environment.
fn is_progress_disabled() -> bool {
    std::env::var("BURROW_NO_PROGRESS").is_ok()
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map_or_else(|_| IndicatifStyle::default_bar(), |style| style.progress_chars("━╸━"))
}

/// Draws an `indicatif` bar per transfer.
///
/// Bars are hidden when `show_progress` is false or `BURROW_NO_PROGRESS` is set.
#[derive(Debug, Clone, Copy)]
pub struct TerminalProgressSink {
    enabled: bool,
}

impl TerminalProgressSink {
    /// Create a sink; `show_progress` usually comes from configuration.
    #[must_use]
    pub fn new(show_progress: bool) -> Self {
        Self {
            enabled: show_progress && !is_progress_disabled(),
        }
    }

    #[cfg(test)]
    const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl ProgressSink for TerminalProgressSink {
    fn start(&self, label: &str, total: u64) -> Box<dyn ProgressObserver> {
        let bar = if self.enabled {
            IndicatifBar::new(total)
        } else {
            IndicatifBar::hidden()
        };
        bar.set_style(download_style());
        bar.set_prefix(label.to_string());
        Box::new(BarObserver(bar))
    }
}

struct BarObserver(IndicatifBar);

impl ProgressObserver for BarObserver {
    fn update(&mut self, done: u64, _total: u64, _percent: u8) {
        self.0.set_position(done);
    }

    fn finish(&mut self) {
        self.0.finish_and_clear();
    }
}

/// A sink that reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _label: &str, _total: u64) -> Box<dyn ProgressObserver> {
        Box::new(NoProgress)
    }
}

impl ProgressObserver for NoProgress {
    fn update(&mut self, _done: u64, _total: u64, _percent: u8) {}

    fn finish(&mut self) {}
}

/// [`AsyncRead`] decorator that reports cumulative progress to an observer.
pub struct ProgressReader<R> {
    inner: R,
    total: u64,
    done: u64,
    last_percent: u8,
    finished: bool,
    observer: Box<dyn ProgressObserver>,
}

impl<R> ProgressReader<R> {
    /// Wrap `inner`, expecting `total` bytes.
    pub fn new(inner: R, total: u64, observer: Box<dyn ProgressObserver>) -> Self {
        Self {
            inner,
            total,
            done: 0,
            last_percent: 0,
            finished: false,
            observer,
        }
    }

    /// Bytes read so far.
    pub const fn bytes_read(&self) -> u64 {
        self.done
    }

    fn advance(&mut self, read: u64) {
        self.done += read;
        if self.total == 0 {
            return;
        }
        let percent = (self.done.saturating_mul(100) / self.total).min(100) as u8;
        if percent >= self.last_percent.saturating_add(REDRAW_THRESHOLD) {
            self.last_percent = percent;
            self.observer.update(self.done, self.total, percent);
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.observer.finish();
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let had_room = buf.remaining() > 0;
        let before = buf.filled().len();

        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let read = (buf.filled().len() - before) as u64;
                if read > 0 {
                    this.advance(read);
                } else if had_room {
                    this.finish();
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;
    use futures::stream;
    use tokio_util::io::StreamReader;

    fn chunked(data: &[u8], chunk: usize) -> impl AsyncRead + Unpin + '_ {
        StreamReader::new(stream::iter(data.chunks(chunk).map(Ok::<_, io::Error>)))
    }

    #[tokio::test]
    async fn test_reports_every_percentage_point() {
        let data = vec![7u8; 300];
        let sink = RecordingSink::default();
        let mut reader = ProgressReader::new(chunked(&data, 1), 300, sink.start("test", 300));
        let mut out = Vec::new();
        tokio::io::copy(&mut reader, &mut out).await.unwrap();

        assert_eq!(out, data);
        let updates = sink.updates();
        assert_eq!(updates.len(), 100);
        assert_eq!(updates.first().map(|u| u.2), Some(1));
        assert_eq!(updates.last().copied(), Some((300, 300, 100)));
        assert_eq!(sink.finished(), 1);
    }

    #[tokio::test]
    async fn test_percent_capped_when_length_understated() {
        let data = vec![1u8; 100];
        let sink = RecordingSink::default();
        let mut reader = ProgressReader::new(chunked(&data, 10), 50, sink.start("test", 50));
        let mut out = Vec::new();
        tokio::io::copy(&mut reader, &mut out).await.unwrap();

        let updates = sink.updates();
        assert!(updates.iter().all(|u| u.2 <= 100));
        assert_eq!(updates.iter().filter(|u| u.2 == 100).count(), 1);
        assert_eq!(reader.bytes_read(), 100);
    }

    #[tokio::test]
    async fn test_large_chunks_skip_intermediate_points() {
        let data = vec![0u8; 1000];
        let sink = RecordingSink::default();
        let mut reader = ProgressReader::new(chunked(&data, 250), 1000, sink.start("test", 1000));
        tokio::io::copy(&mut reader, &mut tokio::io::sink()).await.unwrap();

        let percents: Vec<u8> = sink.updates().iter().map(|u| u.2).collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
        assert_eq!(sink.finished(), 1);
    }

    #[test]
    fn test_terminal_sink_hidden_when_disabled() {
        let sink = TerminalProgressSink::new(false);
        assert!(!sink.is_enabled());
        let mut observer = sink.start("hidden", 10);
        observer.update(5, 10, 50);
        observer.finish();
    }
}
