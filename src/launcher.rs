use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;
use tokio::fs;
use tokio::process::Command as TokioCommand;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::backend::GameBackend;
use crate::catalog::find_fabric_build;
use crate::config::LauncherConfig;
use crate::java_manager::JavaManager;
use crate::library_manager::{LibraryManager, download_file};
use crate::models::{
    AssetIndexFile, FabricGameVersion, InstalledVersion, LaunchCommand, LaunchOptions, MinecraftVersion,
    VersionJson, VersionManifest,
};
use crate::progress::ProgressReporter;
use crate::utils::{classpath_separator, default_java_for, get_os_name, is_library_allowed};

const VERSION_MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest.json";
const FABRIC_GAME_VERSIONS_URL: &str = "https://meta.fabricmc.net/v2/versions/game";
const FABRIC_INSTALLER_URL: &str =
    "https://maven.fabricmc.net/net/fabricmc/fabric-installer/1.1.0/fabric-installer-1.1.0.jar";
const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
const DEFAULT_MAIN_CLASS: &str = "net.minecraft.client.main.Main";
const ASSET_DOWNLOADS: usize = 20;

/// The real game backend: Mojang and Fabric metadata over HTTP, files under
/// the launcher directory. Blocking entry points drive a shared runtime.
pub struct MinecraftLauncher {
    config: LauncherConfig,
    java_manager: JavaManager,
    library_manager: LibraryManager,
    client: Client,
    rt: Arc<Runtime>,
    ram_mb: u32,
}

impl MinecraftLauncher {
    pub fn new(config: LauncherConfig, rt: Arc<Runtime>, ram_mb: u32) -> Self {
        let client = Client::new();
        let java_manager = JavaManager::new(config.runtimes_dir.clone());
        let library_manager =
            LibraryManager::new(config.versions_dir.clone(), config.libraries_dir.clone(), client.clone());
        Self {
            config,
            java_manager,
            library_manager,
            client,
            rt,
            ram_mb,
        }
    }

    async fn fetch_manifest(&self) -> Result<VersionManifest> {
        let response = self.client.get(VERSION_MANIFEST_URL).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Version manifest request failed: {}", response.status()));
        }
        Ok(response.json().await?)
    }

    async fn fetch_fabric_game_versions(&self) -> Result<Vec<FabricGameVersion>> {
        let response = self.client.get(FABRIC_GAME_VERSIONS_URL).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Fabric version list request failed: {}", response.status()));
        }
        Ok(response.json().await?)
    }

    fn version_file(&self, version: &str) -> PathBuf {
        self.config.versions_dir.join(version).join(format!("{}.json", version))
    }

    async fn read_version_json(&self, version: &str) -> Result<VersionJson> {
        let version_file = self.version_file(version);
        let data = fs::read_to_string(&version_file)
            .await
            .with_context(|| format!("Version JSON not found: {}", version_file.display()))?;
        Ok(serde_json::from_str(&data)?)
    }

    async fn ensure_version_json(&self, version: &str) -> Result<VersionJson> {
        let version_file = self.version_file(version);
        if !version_file.exists() {
            let manifest = self.fetch_manifest().await?;
            let info = manifest
                .versions
                .iter()
                .find(|v| v.id == version)
                .ok_or_else(|| anyhow!("Version {} not found in manifest", version))?;
            download_file(&self.client, &info.url, &version_file).await?;
        }
        self.read_version_json(version).await
    }

    async fn install_version_async(&self, version: &str, progress: &ProgressReporter) -> Result<()> {
        progress.set_status(format!("Installing {}", version));
        let version_json = self.ensure_version_json(version).await?;

        if let Some(parent) = &version_json.inherits_from {
            Box::pin(self.install_version_async(parent, progress)).await?;
        }

        if let Some(client) = version_json.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            progress.set_status(format!("Downloading {}.jar", version));
            let jar_path = self.config.versions_dir.join(version).join(format!("{}.jar", version));
            download_file(&self.client, &client.url, &jar_path)
                .await
                .with_context(|| format!("Client jar for {} could not be downloaded", version))?;
        }

        self.library_manager.download_libraries(&version_json, progress).await?;
        self.library_manager.extract_natives(version, &version_json, progress).await?;
        self.prepare_assets(&version_json, progress).await?;
        info!("Installed {}", version);
        Ok(())
    }

    async fn prepare_assets(&self, version_json: &VersionJson, progress: &ProgressReporter) -> Result<()> {
        let Some(asset_index) = &version_json.asset_index else {
            return Ok(());
        };
        let index_path = self.config.assets_dir.join("indexes").join(format!("{}.json", asset_index.id));
        download_file(&self.client, &asset_index.url, &index_path).await?;

        let index_content = fs::read_to_string(&index_path).await?;
        let index: AssetIndexFile = serde_json::from_str(&index_content)?;

        let objects_dir = self.config.assets_dir.join("objects");
        let legacy_virtual_dir = self.config.assets_dir.join("virtual/legacy");
        if index.is_virtual {
            fs::create_dir_all(&legacy_virtual_dir).await?;
        }

        let pending: Vec<_> = index
            .objects
            .into_iter()
            .filter(|(_, object)| object.hash.len() > 2)
            .filter_map(|(name, object)| {
                let object_path = objects_dir.join(&object.hash[0..2]).join(&object.hash);
                let needs_download = !object_path.exists();
                let needs_virtual = index.is_virtual && !legacy_virtual_dir.join(&name).exists();
                (needs_download || needs_virtual).then_some((name, object.hash, object_path, needs_download, needs_virtual))
            })
            .collect();

        let total = pending.len();
        if total == 0 {
            return Ok(());
        }
        progress.set_status(format!("Downloading {} assets", total));
        progress.set_max(total as u64);
        progress.set_progress(0);

        let processed = Arc::new(AtomicUsize::new(0));
        stream::iter(pending)
            .map(|(name, hash, object_path, needs_download, needs_virtual)| {
                let processed = processed.clone();
                let legacy_virtual_dir = legacy_virtual_dir.clone();
                async move {
                    if needs_download {
                        let url = format!("{}/{}/{}", RESOURCES_URL, &hash[0..2], hash);
                        // One missing asset should not abort the install
                        if let Err(e) = download_file(&self.client, &url, &object_path).await {
                            warn!("Failed to download asset {}: {}", name, e);
                        }
                    }
                    if needs_virtual {
                        let virtual_path = legacy_virtual_dir.join(&name);
                        if let Some(parent) = virtual_path.parent() {
                            let _ = fs::create_dir_all(parent).await;
                        }
                        let _ = fs::copy(&object_path, &virtual_path).await;
                    }

                    let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    if current % 50 == 0 || current == total {
                        progress.set_progress(current as u64);
                    }
                }
            })
            .buffer_unordered(ASSET_DOWNLOADS)
            .collect::<Vec<()>>()
            .await;
        Ok(())
    }

    async fn required_java_version(&self, version: &str) -> Result<u32> {
        if !self.version_file(version).exists() {
            return Ok(default_java_for(version));
        }
        let version_json = self.read_version_json(version).await?;
        if let Some(java) = version_json.java_version {
            return Ok(java.major_version);
        }
        if let Some(parent) = version_json.inherits_from {
            return Box::pin(self.required_java_version(&parent)).await;
        }
        Ok(default_java_for(version))
    }

    async fn install_fabric_async(&self, mc_version: &str, progress: &ProgressReporter) -> Result<()> {
        self.install_version_async(mc_version, progress).await?;

        progress.set_status(format!("Installing Fabric for {}", mc_version));
        let installer_path = self.config.cache_dir.join("fabric-installer.jar");
        download_file(&self.client, FABRIC_INSTALLER_URL, &installer_path)
            .await
            .context("Fabric installer could not be downloaded")?;

        let required_java = self.required_java_version(mc_version).await?;
        let java_path = self.java_manager.find_java(required_java)?;

        let output = TokioCommand::new(java_path)
            .arg("-jar")
            .arg(&installer_path)
            .arg("client")
            .arg("-dir")
            .arg(&self.config.launcher_dir)
            .arg("-mcversion")
            .arg(mc_version)
            .arg("-noprofile")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Fabric installation failed: {}", err.trim()));
        }

        let installed = self.scan_installed().await?;
        match find_fabric_build(&installed, mc_version) {
            Some(fabric_id) => {
                let fabric_json = self.read_version_json(&fabric_id).await?;
                self.library_manager.download_libraries(&fabric_json, progress).await?;
                info!("Installed {}", fabric_id);
            }
            None => warn!("Fabric installer finished but no profile for {} was found", mc_version),
        }
        Ok(())
    }

    /// Directories under `versions/` that hold their own `{id}.json`,
    /// oldest first by JSON modification time.
    async fn scan_installed(&self) -> Result<Vec<InstalledVersion>> {
        let mut found: Vec<(SystemTime, String)> = Vec::new();
        let mut read_dir = match fs::read_dir(&self.config.versions_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(metadata) = fs::metadata(self.version_file(&name)).await else {
                continue;
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, name));
        }
        found.sort();
        Ok(found.into_iter().map(|(_, id)| InstalledVersion { id }).collect())
    }

    /// Child libraries first, one jar per `group:artifact`, then the base
    /// game jar.
    async fn build_classpath(&self, start_version: &str) -> Result<String> {
        let os_name = get_os_name();
        let mut classpath: Vec<PathBuf> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = Some(start_version.to_string());
        let mut game_jar: Option<PathBuf> = None;

        while let Some(version) = current {
            let version_json = self.read_version_json(&version).await?;
            for lib in version_json.libraries.iter().filter(|l| is_library_allowed(l, os_name)) {
                let (Some(path), Some(key)) = (self.library_manager.library_path(lib), lib.maven_key()) else {
                    continue;
                };
                if seen.insert(key) {
                    classpath.push(path);
                }
            }
            current = version_json.inherits_from;
            if current.is_none() {
                game_jar = Some(self.config.versions_dir.join(&version).join(format!("{}.jar", version)));
            }
        }

        classpath.extend(game_jar);
        Ok(classpath
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(classpath_separator()))
    }

    async fn launch_command_async(&self, version: &str, options: &LaunchOptions) -> Result<LaunchCommand> {
        let version_json = self.read_version_json(version).await?;

        let mut main_class = version_json.main_class.clone();
        let mut asset_index_id = version_json.asset_index.as_ref().map(|a| a.id.clone());
        let mut base_version = version.to_string();
        let mut parent = version_json.inherits_from.clone();
        while let Some(parent_id) = parent {
            let parent_json = self.read_version_json(&parent_id).await?;
            main_class = main_class.or(parent_json.main_class);
            asset_index_id = asset_index_id.or(parent_json.asset_index.map(|a| a.id));
            parent = parent_json.inherits_from;
            base_version = parent_id;
        }

        let required_java = self.required_java_version(version).await?;
        let java_path = self.java_manager.find_java(required_java)?;
        debug!("Using Java {} at {}", required_java, java_path.display());

        let natives_dir = self.config.versions_dir.join(&base_version).join("natives");
        let classpath = self.build_classpath(version).await?;
        let token = if options.token.is_empty() { "0" } else { options.token.as_str() };

        let mut args = vec![
            format!("-Xmx{}M", self.ram_mb),
            format!("-Xms{}M", self.ram_mb / 2),
            format!("-Djava.library.path={}", natives_dir.display()),
            "-cp".to_string(),
            classpath,
            main_class.unwrap_or_else(|| DEFAULT_MAIN_CLASS.to_string()),
            "--username".to_string(),
            options.username.clone(),
            "--version".to_string(),
            version.to_string(),
            "--gameDir".to_string(),
            self.config.launcher_dir.display().to_string(),
            "--assetsDir".to_string(),
            self.config.assets_dir.display().to_string(),
        ];
        if let Some(id) = asset_index_id {
            args.push("--assetIndex".to_string());
            args.push(id);
        }
        args.extend([
            "--uuid".to_string(),
            options.uuid.clone(),
            "--accessToken".to_string(),
            token.to_string(),
            "--userProperties".to_string(),
            "{}".to_string(),
        ]);

        Ok(LaunchCommand {
            program: java_path,
            args,
            working_dir: self.config.versions_dir.join(version),
        })
    }
}

impl GameBackend for MinecraftLauncher {
    fn release_versions(&self) -> Result<Vec<MinecraftVersion>> {
        Ok(self.rt.block_on(self.fetch_manifest())?.versions)
    }

    fn fabric_game_versions(&self) -> Result<Vec<FabricGameVersion>> {
        self.rt.block_on(self.fetch_fabric_game_versions())
    }

    fn install_version(&self, version_id: &str, progress: &ProgressReporter) -> Result<()> {
        self.rt.block_on(self.install_version_async(version_id, progress))
    }

    fn install_fabric(&self, minecraft_version: &str, progress: &ProgressReporter) -> Result<()> {
        self.rt.block_on(self.install_fabric_async(minecraft_version, progress))
    }

    fn installed_versions(&self) -> Result<Vec<InstalledVersion>> {
        self.rt.block_on(self.scan_installed())
    }

    fn launch_command(&self, version_id: &str, options: &LaunchOptions) -> Result<LaunchCommand> {
        self.rt.block_on(self.launch_command_async(version_id, options))
    }
}
