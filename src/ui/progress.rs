use crate::sync::SyncEvent;
use indicatif::ProgressBar;
use std::thread;

/// Renders a live progress bar from the orchestrator's event stream.
///
/// The bar's length grows as units are discovered, so a date-range sync
/// that cascades into boxscores and play-by-play feeds keeps an accurate
/// denominator. Rendering is suppressed when stdout is not a terminal.
pub struct SyncProgress {
    bar: ProgressBar,
    _handle: thread::JoinHandle<()>,
}

impl SyncProgress {
    pub fn start() -> (Self, crossbeam::channel::Sender<SyncEvent>) {
        let (tx, rx) = crossbeam::channel::unbounded::<SyncEvent>();

        let bar = if console::Term::stdout().is_term() {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };

        let bar_clone = bar.clone();
        let handle = thread::spawn(move || {
            for event in rx {
                match event {
                    SyncEvent::Discovered { count } => {
                        bar_clone.inc_length(count as u64);
                    }
                    SyncEvent::Started { unit } => {
                        bar_clone.set_message(unit.to_string());
                    }
                    SyncEvent::Completed { .. } => {
                        bar_clone.inc(1);
                    }
                    SyncEvent::Failed { unit, .. } => {
                        bar_clone.inc(1);
                        bar_clone.println(format!("failed: {unit}"));
                    }
                }
            }
        });

        (
            Self {
                bar,
                _handle: handle,
            },
            tx,
        )
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
