//! Progress observers.
//!
//! Observers are called synchronously at every step transition. They have no
//! say in control flow: a panicking observer is logged and the run goes on.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::mpsc;
use tracing::warn;
use unitdeploy_protocol::ProgressEvent;

/// Receives step transitions of an upgrade run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards progress events to an unbounded channel.
///
/// A closed receiver silently drops events; the run is not affected.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Creates a reporter together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Emits events to an optional observer, shielding the pipeline from it.
#[derive(Clone, Copy)]
pub(crate) struct Progress<'a> {
    reporter: Option<&'a dyn ProgressReporter>,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(reporter: Option<&'a dyn ProgressReporter>) -> Self {
        Self { reporter }
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        let Some(reporter) = self.reporter else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| reporter.report(event))).is_err() {
            warn!(%event, "progress observer panicked, event dropped");
        }
    }
}
