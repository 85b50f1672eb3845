use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use tracing::{info, warn};

use crate::backend::GameBackend;
use crate::credentials::{AuthOutcome, CredentialStore};
use crate::database::Database;
use crate::errors::{SessionError, StoreError};
use crate::models::{InstallProgress, VersionEntry};
use crate::progress::{LaunchEvent, LaunchStage};
use crate::remember::RememberFile;
use crate::stats::{LaunchStat, StatsStore};
use crate::worker::{LaunchJob, LaunchWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    BothEmpty,
    LoginEmpty,
    PasswordEmpty,
}

impl ValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            ValidationError::BothEmpty => "Enter login and password!",
            ValidationError::LoginEmpty => "Enter login!",
            ValidationError::PasswordEmpty => "Enter password!",
        }
    }
}

pub fn validate(login: &str, password: &str) -> Result<(), ValidationError> {
    match (login.is_empty(), password.is_empty()) {
        (true, true) => Err(ValidationError::BothEmpty),
        (true, false) => Err(ValidationError::LoginEmpty),
        (false, true) => Err(ValidationError::PasswordEmpty),
        (false, false) => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Busy,
    Invalid(ValidationError),
    Denied(AuthOutcome),
    Started(AuthOutcome),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
    pub locked: bool,
}

/// UI-side state of a launcher session. Lives on the UI thread; the worker
/// only talks to it through the event channel.
pub struct SessionController<B: GameBackend> {
    credentials: CredentialStore,
    stats: StatsStore,
    remember: RememberFile,
    remember_enabled: bool,
    worker: LaunchWorker<B>,
    events: Receiver<LaunchEvent>,
    entries: Vec<VersionEntry>,
    selected: Option<usize>,
    form: LoginForm,
    status: String,
    busy: bool,
    stage: Option<LaunchStage>,
    progress: Option<InstallProgress>,
    failed: bool,
}

impl<B: GameBackend> SessionController<B> {
    pub fn new(db: Arc<Database>, backend: Arc<B>, entries: Vec<VersionEntry>, remember: RememberFile) -> Self {
        let (tx, rx) = mpsc::channel();
        let selected = if entries.is_empty() { None } else { Some(0) };
        Self {
            credentials: CredentialStore::new(db.clone()),
            stats: StatsStore::new(db),
            remember,
            remember_enabled: true,
            worker: LaunchWorker::new(backend, tx),
            events: rx,
            entries,
            selected,
            form: LoginForm::default(),
            status: String::new(),
            busy: false,
            stage: None,
            progress: None,
            failed: false,
        }
    }

    pub fn set_remember(&mut self, enabled: bool) {
        self.remember_enabled = enabled;
        if !enabled {
            if let Err(e) = self.remember.forget() {
                warn!("Could not remove {}: {}", self.remember.path().display(), e);
            }
        }
    }

    /// Fills the form from the remembered credentials, if any.
    pub fn prefill(&mut self) -> bool {
        if !self.remember_enabled || self.form.locked {
            return false;
        }
        match self.remember.load() {
            Some(saved) => {
                self.form.login = saved.login;
                self.form.password = saved.password;
                true
            }
            None => false,
        }
    }

    pub fn set_login(&mut self, login: impl Into<String>) {
        if !self.form.locked {
            self.form.login = login.into();
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        if !self.form.locked {
            self.form.password = password.into();
        }
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&VersionEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }

    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.busy || self.worker.is_busy()
    }

    pub fn stage(&self) -> Option<LaunchStage> {
        self.stage
    }

    pub fn progress(&self) -> Option<&InstallProgress> {
        self.progress.as_ref()
    }

    /// The "Play" action: validate, authenticate, count the launch, hand off to the worker.
    pub fn submit(&mut self) -> Result<Submission, SessionError> {
        if self.is_busy() {
            self.status = "The game is already running".to_string();
            return Ok(Submission::Busy);
        }

        if let Err(invalid) = validate(&self.form.login, &self.form.password) {
            self.status = invalid.message().to_string();
            return Ok(Submission::Invalid(invalid));
        }

        let entry = self.selected_entry().cloned().ok_or(SessionError::NoVersionSelected)?;

        let outcome = self
            .credentials
            .authenticate_or_register(&self.form.login, &self.form.password)?;
        self.status = outcome.message().to_string();
        if !outcome.is_success() {
            return Ok(Submission::Denied(outcome));
        }

        if self.remember_enabled {
            // Plaintext on disk, only used to pre-fill the form next time.
            if let Err(e) = self.remember.save(&self.form.login, &self.form.password) {
                warn!("Could not save remembered credentials: {}", e);
            }
        }

        self.stats
            .record_launch(&entry.label, entry.descriptor.release_time.as_deref())?;

        self.form.locked = true;
        info!("Starting {} for {}", entry.label, self.form.login);
        self.worker
            .start(LaunchJob {
                selection_label: entry.label,
                descriptor: entry.descriptor,
                username: self.form.login.clone(),
            })
            .map_err(|e| {
                self.status = format!("Launch failed: {}", e);
                SessionError::Launch(e)
            })?;

        Ok(Submission::Started(outcome))
    }

    pub fn apply(&mut self, event: &LaunchEvent) {
        match event {
            LaunchEvent::StateChanged { busy: true } => {
                self.busy = true;
                self.failed = false;
                self.progress = None;
            }
            LaunchEvent::StateChanged { busy: false } => {
                self.busy = false;
                self.stage = None;
                self.progress = None;
                if !self.failed {
                    self.status = "Game closed".to_string();
                }
            }
            LaunchEvent::Stage(stage) => self.stage = Some(*stage),
            LaunchEvent::Progress(progress) => self.progress = Some(progress.clone()),
            LaunchEvent::Failed { message } => {
                self.failed = true;
                self.status = format!("Launch failed: {}", message);
            }
        }
    }

    /// Waits up to `timeout` for the next worker event and applies it.
    pub fn next_event_timeout(&mut self, timeout: Duration) -> Option<LaunchEvent> {
        let event = self.events.recv_timeout(timeout).ok()?;
        self.apply(&event);
        Some(event)
    }

    /// Applies every event already queued, without waiting.
    pub fn poll_events(&mut self) -> usize {
        let pending: Vec<LaunchEvent> = self.events.try_iter().collect();
        for event in &pending {
            self.apply(event);
        }
        pending.len()
    }

    /// Statistics view; a blank filter lists everything.
    pub fn statistics(&self, filter: &str) -> Result<Vec<LaunchStat>, StoreError> {
        if filter.trim().is_empty() {
            self.stats.query_all()
        } else {
            self.stats.query_filtered(filter)
        }
    }
}
