//! Progress sinks for the analysis grid.
//!
//! The pipeline pushes `(completed, total)` before each grid unit. It makes
//! no assumption about the sink beyond it returning promptly.

use tokio::sync::mpsc;
use tracing::info;

pub trait ProgressReporter: Send + Sync {
    fn report(&self, completed: u64, total: u64);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _completed: u64, _total: u64) {}
}

/// Writes one log line per update.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, completed: u64, total: u64) {
        info!("Iterations done: {completed} of {total}");
    }
}

/// One progress update as delivered by [`ChannelReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub completed: u64,
    pub total: u64,
}

/// Queues updates for whoever owns presentation state.
///
/// Sending never blocks; if the receiver is gone the update is dropped.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, completed: u64, total: u64) {
        let _ = self.tx.send(ProgressUpdate { completed, total });
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for std::sync::Arc<R> {
    fn report(&self, completed: u64, total: u64) {
        (**self).report(completed, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_reporter_delivers_in_order() {
        let (reporter, mut rx) = ChannelReporter::new();
        reporter.report(0, 3);
        reporter.report(1, 3);
        reporter.report(2, 3);

        let got: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            got,
            vec![
                ProgressUpdate { completed: 0, total: 3 },
                ProgressUpdate { completed: 1, total: 3 },
                ProgressUpdate { completed: 2, total: 3 },
            ]
        );
    }

    #[test]
    fn channel_reporter_tolerates_closed_receiver() {
        let (reporter, rx) = ChannelReporter::new();
        drop(rx);
        reporter.report(5, 10);
    }

    #[test]
    fn noop_and_log_reporters_accept_updates() {
        NoopReporter.report(0, 0);
        LogReporter.report(1, 2);
    }
}
