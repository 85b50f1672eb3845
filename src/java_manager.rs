use anyhow::{Result, anyhow};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

fn java_binary() -> &'static str {
    if cfg!(target_os = "windows") { "java.exe" } else { "java" }
}

#[derive(Debug, Clone)]
pub struct JavaManager {
    runtimes_dir: PathBuf,
}

impl JavaManager {
    pub fn new(runtimes_dir: PathBuf) -> Self {
        Self { runtimes_dir }
    }

    fn runtime_dir(&self, version: u32) -> PathBuf {
        self.runtimes_dir.join(format!("java-{}", version))
    }

    /// Managed runtime `runtimes/java-{version}` first, then JAVA_HOME, PATH
    /// and the usual install locations.
    pub fn find_java(&self, required: u32) -> Result<PathBuf> {
        let managed = self.runtime_dir(required).join("bin").join(java_binary());
        if managed.exists() {
            return Ok(managed);
        }

        if let Ok(home) = env::var("JAVA_HOME") {
            let java = Path::new(&home).join("bin").join(java_binary());
            if java.exists() {
                debug!("Using Java from JAVA_HOME: {}", java.display());
                return Ok(java);
            }
        }

        // Search for Java in PATH
        if let Ok(output) = Command::new("which").arg("java").output() {
            if output.status.success() {
                let java_path = String::from_utf8(output.stdout)?;
                let java_path = java_path.trim();
                if !java_path.is_empty() {
                    debug!("Using Java from PATH: {}", java_path);
                    return Ok(PathBuf::from(java_path));
                }
            }
        }

        let common_paths = ["/usr/bin/java", "/usr/local/bin/java", "/opt/java/bin/java"];
        for path in common_paths {
            if Path::new(path).exists() {
                return Ok(PathBuf::from(path));
            }
        }

        Err(anyhow!(
            "Java Runtime {} is missing. Install it or place it in {}",
            required,
            self.runtime_dir(required).display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_runtime_is_preferred() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("java-17").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(java_binary()), "").unwrap();

        let manager = JavaManager::new(tmp.path().to_path_buf());
        assert_eq!(manager.find_java(17).unwrap(), bin.join(java_binary()));
    }
}
