// config.rs - Launcher directory layout and file system operations

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

const LAUNCHER_DIR_NAME: &str = ".rowdylauncher";
const DATABASE_FILE: &str = "database.db";
const REMEMBER_FILE: &str = ".temp.dat";

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub launcher_dir: PathBuf,
    pub versions_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub libraries_dir: PathBuf,
    pub runtimes_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl LauncherConfig {
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(Self::with_dir(home.join(LAUNCHER_DIR_NAME)))
    }

    pub fn with_dir(launcher_dir: impl Into<PathBuf>) -> Self {
        let launcher_dir = launcher_dir.into();
        Self {
            versions_dir: launcher_dir.join("versions"),
            assets_dir: launcher_dir.join("assets"),
            libraries_dir: launcher_dir.join("libraries"),
            runtimes_dir: launcher_dir.join("runtimes"),
            cache_dir: launcher_dir.join("cache"),
            logs_dir: launcher_dir.join("logs"),
            launcher_dir,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.launcher_dir.join(DATABASE_FILE)
    }

    pub fn remember_path(&self) -> PathBuf {
        self.launcher_dir.join(REMEMBER_FILE)
    }

    pub async fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.launcher_dir).await?;
        fs::create_dir_all(&self.versions_dir).await?;
        fs::create_dir_all(&self.assets_dir).await?;
        fs::create_dir_all(&self.libraries_dir).await?;
        fs::create_dir_all(&self.runtimes_dir).await?;
        fs::create_dir_all(&self.cache_dir).await?;
        fs::create_dir_all(&self.logs_dir).await?;
        Ok(())
    }
}
