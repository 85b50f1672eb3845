use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::InstallProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Installing,
    Resolving,
    Launching,
}

impl LaunchStage {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchStage::Installing => "Installing",
            LaunchStage::Resolving => "Resolving version",
            LaunchStage::Launching => "Game running",
        }
    }
}

/// Messages from the launch worker to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    StateChanged { busy: bool },
    Stage(LaunchStage),
    Progress(InstallProgress),
    Failed { message: String },
}

pub type EventTx = Sender<LaunchEvent>;

/// Install hook handed to the backend. Status, current and max arrive as
/// separate updates; each one re-emits the full triple.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<Mutex<InstallProgress>>,
    tx: EventTx,
}

impl ProgressReporter {
    pub fn new(tx: EventTx) -> Self {
        Self {
            state: Arc::new(Mutex::new(InstallProgress {
                current: 0,
                max: 0,
                label: String::new(),
            })),
            tx,
        }
    }

    pub fn set_status(&self, label: impl Into<String>) {
        let label = label.into();
        self.update(|p| p.label = label);
    }

    pub fn set_progress(&self, current: u64) {
        self.update(|p| p.current = current);
    }

    pub fn set_max(&self, max: u64) {
        self.update(|p| p.max = max);
    }

    pub fn snapshot(&self) -> InstallProgress {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update(&self, apply: impl FnOnce(&mut InstallProgress)) {
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            apply(&mut state);
            state.clone()
        };
        // The UI may already be gone on shutdown.
        let _ = self.tx.send(LaunchEvent::Progress(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn progress(current: u64, max: u64, label: &str) -> LaunchEvent {
        LaunchEvent::Progress(InstallProgress {
            current,
            max,
            label: label.to_string(),
        })
    }

    #[test]
    fn test_updates_are_coalesced_with_last_known_values() {
        let (tx, rx) = mpsc::channel();
        let reporter = ProgressReporter::new(tx);

        reporter.set_status("Download libraries");
        reporter.set_max(10);
        reporter.set_progress(3);
        reporter.set_status("Download assets");

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                progress(0, 0, "Download libraries"),
                progress(0, 10, "Download libraries"),
                progress(3, 10, "Download libraries"),
                progress(3, 10, "Download assets"),
            ]
        );
        assert_eq!(reporter.snapshot().label, "Download assets");
    }

    #[test]
    fn test_clones_share_state() {
        let (tx, rx) = mpsc::channel();
        let reporter = ProgressReporter::new(tx);
        let other = reporter.clone();

        reporter.set_max(5);
        other.set_progress(5);

        assert_eq!(rx.try_iter().last(), Some(progress(5, 5, "")));
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let reporter = ProgressReporter::new(tx);
        reporter.set_progress(1);
        assert_eq!(reporter.snapshot().current, 1);
    }
}
