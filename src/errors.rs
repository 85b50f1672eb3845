use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Database lock poisoned")]
    LockPoisoned,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Another launch is already in progress")]
    Busy,
    #[error("No installed Fabric build found for Minecraft {0}")]
    FabricVersionNotFound(String),
    #[error("Failed to start the game process: {0}")]
    Spawn(#[from] io::Error),
    #[error("Failed to start the launch worker: {0}")]
    WorkerThread(#[source] io::Error),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No version selected")]
    NoVersionSelected,
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
