//! UI synchronization: the collaborator that shows status text and the
//! per-marker indicator grid.
//!
//! The tracking core only pushes into a [`UiSync`]; it never reads back.

use tracing::{error, info};

use crate::tracking::ActiveSummary;

/// Receiver of user-visible state.
pub trait UiSync {
    /// Aggregate marker state after a visibility transition.
    fn publish(&mut self, summary: &ActiveSummary);

    /// Free-form status text; `is_error` marks failures.
    fn status(&mut self, message: &str, is_error: bool);
}

/// Writes status and marker summaries to the log.
#[derive(Debug, Default)]
pub struct LogUi {
    last_count: Option<usize>,
}

impl LogUi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UiSync for LogUi {
    fn publish(&mut self, summary: &ActiveSummary) {
        if self.last_count != Some(summary.active_count) {
            info!("{} [{}]", summary.status_line(), indicator_row(summary));
        }
        self.last_count = Some(summary.active_count);
    }

    fn status(&mut self, message: &str, is_error: bool) {
        if is_error {
            error!("{}", message);
        } else {
            info!("{}", message);
        }
    }
}

/// Keeps everything it receives. Handy for headless embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingUi {
    pub summaries: Vec<ActiveSummary>,
    pub statuses: Vec<(String, bool)>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_summary(&self) -> Option<&ActiveSummary> {
        self.summaries.last()
    }

    pub fn last_status(&self) -> Option<(&str, bool)> {
        self.statuses.last().map(|(m, e)| (m.as_str(), *e))
    }
}

impl UiSync for RecordingUi {
    fn publish(&mut self, summary: &ActiveSummary) {
        self.summaries.push(summary.clone());
    }

    fn status(&mut self, message: &str, is_error: bool) {
        self.statuses.push((message.to_string(), is_error));
    }
}

impl<T: UiSync + ?Sized> UiSync for Box<T> {
    fn publish(&mut self, summary: &ActiveSummary) {
        (**self).publish(summary);
    }

    fn status(&mut self, message: &str, is_error: bool) {
        (**self).status(message, is_error);
    }
}

impl<T: UiSync + ?Sized> UiSync for &mut T {
    fn publish(&mut self, summary: &ActiveSummary) {
        (**self).publish(summary);
    }

    fn status(&mut self, message: &str, is_error: bool) {
        (**self).status(message, is_error);
    }
}

/// One character per marker: `●` tracked, `○` not tracked.
pub fn indicator_row(summary: &ActiveSummary) -> String {
    summary
        .per_marker_active
        .iter()
        .map(|active| if *active { '●' } else { '○' })
        .collect()
}
