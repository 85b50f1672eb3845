use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::models::{Library, LibraryArtifact, VersionJson};
use crate::progress::ProgressReporter;
use crate::utils::{get_os_name, is_library_allowed};

const LIBRARIES_URL: &str = "https://libraries.minecraft.net";

pub async fn download_file(client: &Client, url: &str, path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("Failed to download file from {}: {}", url, response.status()));
    }
    let bytes = response.bytes().await?;

    // Parallel downloads may race on the parent directory
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, &bytes).await?;
    Ok(())
}

#[derive(Clone)]
pub struct LibraryManager {
    versions_dir: PathBuf,
    libraries_dir: PathBuf,
    client: Client,
}

impl LibraryManager {
    pub fn new(versions_dir: PathBuf, libraries_dir: PathBuf, client: Client) -> Self {
        Self {
            versions_dir,
            libraries_dir,
            client,
        }
    }

    /// Download URL and local path of a library jar. Explicit artifacts win,
    /// otherwise the Maven layout under the library's own repository.
    pub fn library_target(&self, lib: &Library) -> Option<(String, PathBuf)> {
        if let Some(artifact) = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            return Some((artifact.url.clone(), self.libraries_dir.join(&artifact.path)));
        }
        let rel_path = lib.maven_path()?;
        let base = lib.url.as_deref().unwrap_or(LIBRARIES_URL).trim_end_matches('/');
        Some((format!("{}/{}", base, rel_path), self.libraries_dir.join(&rel_path)))
    }

    pub fn library_path(&self, lib: &Library) -> Option<PathBuf> {
        self.library_target(lib).map(|(_, path)| path)
    }

    pub async fn download_libraries(&self, version_json: &VersionJson, progress: &ProgressReporter) -> Result<()> {
        let os_name = get_os_name();
        let targets: Vec<(String, PathBuf)> = version_json
            .libraries
            .iter()
            .filter(|lib| is_library_allowed(lib, os_name))
            .filter_map(|lib| self.library_target(lib))
            .collect();

        progress.set_status(format!("Downloading libraries for {}", version_json.id));
        progress.set_max(targets.len() as u64);
        for (i, (url, path)) in targets.iter().enumerate() {
            download_file(&self.client, url, path)
                .await
                .with_context(|| format!("Library {} could not be downloaded", url))?;
            progress.set_progress(i as u64 + 1);
        }
        Ok(())
    }

    fn native_artifact(lib: &Library, os_name: &str) -> Option<LibraryArtifact> {
        let downloads = lib.downloads.as_ref()?;

        // 1. Strict 'natives' map
        if let (Some(natives), Some(classifiers)) = (&lib.natives, &downloads.classifiers) {
            if let Some(artifact) = natives.get(os_name).and_then(|c| classifiers.get(c)) {
                return Some(artifact.clone());
            }
        }

        // 2. heuristic: natives-{os} classifier
        if let Some(artifact) = downloads
            .classifiers
            .as_ref()
            .and_then(|c| c.get(&format!("natives-{}", os_name)))
        {
            return Some(artifact.clone());
        }

        // 3. heuristic: main artifact is itself a natives jar (1.19+)
        downloads
            .artifact
            .as_ref()
            .filter(|a| a.path.contains(&format!("natives-{}", os_name)) || lib.name.contains(&format!("natives-{}", os_name)))
            .cloned()
    }

    pub async fn extract_natives(&self, version: &str, version_json: &VersionJson, progress: &ProgressReporter) -> Result<()> {
        let version_dir = self.versions_dir.join(version);
        let natives_dir = version_dir.join("natives");
        let os_name = get_os_name();

        progress.set_status(format!("Extracting natives for {}", version));
        fs::create_dir_all(&natives_dir).await?;

        for lib in &version_json.libraries {
            if !is_library_allowed(lib, os_name) {
                continue;
            }
            let Some(artifact) = Self::native_artifact(lib, os_name) else {
                continue;
            };

            let native_zip_path = version_dir.join(format!("{}.zip", lib.name.replace(':', "_")));
            download_file(&self.client, &artifact.url, &native_zip_path).await?;

            let nd = natives_dir.clone();
            let nzp = native_zip_path.clone();
            let exclude = lib.get_extract().map(|e| e.exclude.clone()).unwrap_or_default();

            let extracted = tokio::task::spawn_blocking(move || extract_native_archive(&nzp, &nd, &exclude)).await?;
            match extracted {
                Ok(count) => debug!("Extracted {} native files from {}", count, lib.name),
                Err(e) => warn!("Failed to extract natives from {}: {}", lib.name, e),
            }
        }

        Ok(())
    }
}

/// Flattens `.so`/`.dll`/`.dylib` entries into `natives_dir`, honoring `extract.exclude`.
fn extract_native_archive(archive_path: &Path, natives_dir: &Path, exclude: &[String]) -> Result<usize> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if exclude.iter().any(|ex| name.starts_with(ex)) || name.ends_with('/') {
            continue;
        }
        if !(name.ends_with(".so") || name.ends_with(".dll") || name.ends_with(".dylib")) {
            continue;
        }
        let filename = Path::new(&name)
            .file_name()
            .map(|f| f.to_os_string())
            .unwrap_or_else(|| name.clone().into());
        let mut outfile = std::fs::File::create(natives_dir.join(filename))?;
        std::io::copy(&mut entry, &mut outfile)?;
        count += 1;
    }
    Ok(count)
}
