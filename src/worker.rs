// worker.rs - Background install-and-launch job
//
// One job at a time: Installing -> Resolving -> Launching, then back to idle.
// The idle notification comes from `BusyGuard::drop`, so it is sent on every
// exit path of the worker thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::GameBackend;
use crate::catalog::find_fabric_build;
use crate::errors::LaunchError;
use crate::models::{Channel, LaunchOptions, VersionDescriptor};
use crate::progress::{EventTx, LaunchEvent, LaunchStage, ProgressReporter};

#[derive(Debug, Clone)]
pub struct LaunchJob {
    pub selection_label: String,
    pub descriptor: VersionDescriptor,
    pub username: String,
}

struct BusyGuard {
    busy: Arc<AtomicBool>,
    tx: EventTx,
}

impl BusyGuard {
    fn acquire(busy: &Arc<AtomicBool>, tx: &EventTx) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        let _ = tx.send(LaunchEvent::StateChanged { busy: true });
        Some(Self {
            busy: busy.clone(),
            tx: tx.clone(),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
        let _ = self.tx.send(LaunchEvent::StateChanged { busy: false });
    }
}

pub struct LaunchWorker<B: GameBackend> {
    backend: Arc<B>,
    tx: EventTx,
    busy: Arc<AtomicBool>,
}

impl<B: GameBackend> LaunchWorker<B> {
    pub fn new(backend: Arc<B>, tx: EventTx) -> Self {
        Self {
            backend,
            tx,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Runs `job` on a fresh thread. Refused while a previous job is still running.
    pub fn start(&self, job: LaunchJob) -> Result<JoinHandle<()>, LaunchError> {
        let guard = BusyGuard::acquire(&self.busy, &self.tx).ok_or(LaunchError::Busy)?;
        let backend = self.backend.clone();
        let tx = self.tx.clone();

        thread::Builder::new()
            .name("launch-worker".to_string())
            .spawn(move || {
                let _guard = guard;
                let message = match panic::catch_unwind(AssertUnwindSafe(|| run_job(backend.as_ref(), &job, &tx))) {
                    Ok(Ok(())) => return,
                    Ok(Err(e)) => format!("{:#}", e),
                    Err(payload) => format!("Launch worker panicked: {}", panic_message(&*payload)),
                };
                error!("Launch of {} failed: {}", job.selection_label, message);
                // Failed must reach the UI before the guard reports idle
                let _ = tx.send(LaunchEvent::Failed { message });
            })
            .map_err(LaunchError::WorkerThread)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn enter(tx: &EventTx, stage: LaunchStage) {
    info!("Launch stage: {}", stage.label());
    let _ = tx.send(LaunchEvent::Stage(stage));
}

/// The whole job, on the calling thread. Blocks until the game exits.
pub fn run_job<B: GameBackend + ?Sized>(backend: &B, job: &LaunchJob, tx: &EventTx) -> Result<(), LaunchError> {
    let descriptor = &job.descriptor;
    let reporter = ProgressReporter::new(tx.clone());

    enter(tx, LaunchStage::Installing);
    info!("Installing {} for {}", job.selection_label, job.username);
    match descriptor.channel {
        Channel::Vanilla => backend.install_version(&descriptor.id, &reporter)?,
        Channel::Fabric => backend.install_fabric(&descriptor.id, &reporter)?,
    }
    let last = reporter.snapshot();
    debug!("Install finished at {}/{} ({})", last.current, last.max, last.label);

    enter(tx, LaunchStage::Resolving);
    let version_id = resolve_runnable_id(backend, descriptor)?;
    info!("Runnable version for {} is {}", job.selection_label, version_id);

    enter(tx, LaunchStage::Launching);
    let options = LaunchOptions {
        username: job.username.clone(),
        uuid: Uuid::new_v4().to_string(),
        token: String::new(),
    };
    let command = backend.launch_command(&version_id, &options)?;
    info!("Starting {} with {} arguments", command.program.display(), command.args.len());

    let status = Command::new(&command.program)
        .args(&command.args)
        .current_dir(&command.working_dir)
        .status()?;

    if status.success() {
        info!("Game exited normally");
    } else {
        warn!("Game exited with {}", status);
    }
    Ok(())
}

pub fn resolve_runnable_id<B: GameBackend + ?Sized>(
    backend: &B,
    descriptor: &VersionDescriptor,
) -> Result<String, LaunchError> {
    match descriptor.channel {
        Channel::Vanilla => Ok(descriptor.id.clone()),
        Channel::Fabric => {
            let installed = backend.installed_versions()?;
            find_fabric_build(&installed, &descriptor.id)
                .ok_or_else(|| LaunchError::FabricVersionNotFound(descriptor.id.clone()))
        }
    }
}
