use anyhow::Result;

use crate::models::{FabricGameVersion, InstalledVersion, LaunchCommand, LaunchOptions, MinecraftVersion};
use crate::progress::ProgressReporter;

/// Everything the launcher needs from the game side: version lists,
/// installation, and building the game command line. Calls block; the
/// install directory is fixed when the backend is built.
pub trait GameBackend: Send + Sync + 'static {
    /// All versions of the Mojang manifest, newest first.
    fn release_versions(&self) -> Result<Vec<MinecraftVersion>>;

    /// Minecraft versions Fabric can be installed on.
    fn fabric_game_versions(&self) -> Result<Vec<FabricGameVersion>>;

    fn install_version(&self, version_id: &str, progress: &ProgressReporter) -> Result<()>;

    /// Installs the base game and the latest Fabric loader for it.
    fn install_fabric(&self, minecraft_version: &str, progress: &ProgressReporter) -> Result<()>;

    /// Installed version ids, oldest first.
    fn installed_versions(&self) -> Result<Vec<InstalledVersion>>;

    fn launch_command(&self, version_id: &str, options: &LaunchOptions) -> Result<LaunchCommand>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use anyhow::bail;

    use crate::models::MinecraftVersion;

    pub const FABRIC_LOADER: &str = "0.15.0";

    /// In-memory backend recording every call.
    pub struct FakeBackend {
        pub installed: Mutex<Vec<InstalledVersion>>,
        pub calls: Mutex<Vec<String>>,
        pub launched_with: Mutex<Vec<(String, LaunchOptions)>>,
        pub fail_install: bool,
        pub panic_install: bool,
        pub skip_fabric_profile: bool,
        pub program: PathBuf,
        pub args: Vec<String>,
    }

    impl FakeBackend {
        /// Launch command that exits immediately with status 0.
        pub fn new() -> Self {
            Self {
                installed: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                launched_with: Mutex::new(Vec::new()),
                fail_install: false,
                panic_install: false,
                skip_fabric_profile: false,
                program: PathBuf::from("sh"),
                args: vec!["-c".to_string(), "exit 0".to_string()],
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn add_installed(&self, id: String) {
            let mut installed = self.installed.lock().unwrap();
            if !installed.iter().any(|v| v.id == id) {
                installed.push(InstalledVersion { id });
            }
        }
    }

    impl GameBackend for FakeBackend {
        fn release_versions(&self) -> Result<Vec<MinecraftVersion>> {
            self.record("release_versions".to_string());
            Ok(vec![
                MinecraftVersion {
                    id: "1.20.1".to_string(),
                    version_type: "release".to_string(),
                    url: "https://example.invalid/1.20.1.json".to_string(),
                    release_time: Some("2023-06-12T13:25:51+00:00".to_string()),
                },
                MinecraftVersion {
                    id: "23w31a".to_string(),
                    version_type: "snapshot".to_string(),
                    url: "https://example.invalid/23w31a.json".to_string(),
                    release_time: Some("2023-08-01T12:00:00+00:00".to_string()),
                },
            ])
        }

        fn fabric_game_versions(&self) -> Result<Vec<FabricGameVersion>> {
            self.record("fabric_game_versions".to_string());
            Ok(vec![
                FabricGameVersion { version: "23w31a".to_string(), stable: false },
                FabricGameVersion { version: "1.20.1".to_string(), stable: true },
            ])
        }

        fn install_version(&self, version_id: &str, progress: &ProgressReporter) -> Result<()> {
            self.record(format!("install_version {}", version_id));
            if self.panic_install {
                panic!("install of {} blew up", version_id);
            }
            if self.fail_install {
                bail!("download of {} failed", version_id);
            }
            progress.set_status(format!("Installing {}", version_id));
            progress.set_max(2);
            progress.set_progress(1);
            progress.set_progress(2);
            self.add_installed(version_id.to_string());
            Ok(())
        }

        fn install_fabric(&self, minecraft_version: &str, progress: &ProgressReporter) -> Result<()> {
            self.record(format!("install_fabric {}", minecraft_version));
            if self.fail_install {
                bail!("fabric installer failed");
            }
            progress.set_status("Installing Fabric");
            self.add_installed(minecraft_version.to_string());
            if !self.skip_fabric_profile {
                self.add_installed(format!("fabric-loader-{}-{}", FABRIC_LOADER, minecraft_version));
            }
            Ok(())
        }

        fn installed_versions(&self) -> Result<Vec<InstalledVersion>> {
            self.record("installed_versions".to_string());
            Ok(self.installed.lock().unwrap().clone())
        }

        fn launch_command(&self, version_id: &str, options: &LaunchOptions) -> Result<LaunchCommand> {
            self.record(format!("launch_command {}", version_id));
            self.launched_with
                .lock()
                .unwrap()
                .push((version_id.to_string(), options.clone()));
            Ok(LaunchCommand {
                program: self.program.clone(),
                args: self.args.clone(),
                working_dir: std::env::temp_dir(),
            })
        }
    }
}
