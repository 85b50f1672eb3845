use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

// --- Remote metadata ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinecraftVersion {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(rename = "releaseTime")]
    pub release_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<MinecraftVersion>,
}

/// Entry of the Fabric meta `/v2/versions/game` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricGameVersion {
    pub version: String,
    pub stable: bool,
}

// --- Version JSON ---

#[derive(Deserialize, Debug, Clone)]
pub struct Extract {
    pub exclude: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OsRule {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Rule {
    pub action: String,
    pub os: Option<OsRule>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LibraryArtifact {
    pub url: String,
    pub path: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LibraryDownloads {
    pub artifact: Option<LibraryArtifact>,
    pub classifiers: Option<HashMap<String, LibraryArtifact>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Library {
    pub name: String,
    pub downloads: Option<LibraryDownloads>,
    pub natives: Option<HashMap<String, String>>,
    pub rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub extract: Option<Extract>,
    /// Maven repository base, used by Fabric libraries instead of `downloads`.
    #[serde(default)]
    pub url: Option<String>,
}

impl Library {
    pub fn get_extract(&self) -> Option<&Extract> {
        self.extract.as_ref()
    }

    /// `group/artifact/version/artifact-version[-classifier].jar`
    pub fn maven_path(&self) -> Option<String> {
        let parts: Vec<&str> = self.name.split(':').collect();
        if parts.len() < 3 {
            return None;
        }
        let group = parts[0].replace('.', "/");
        let artifact_id = parts[1];
        let version = parts[2];
        let suffix = parts.get(3).map(|c| format!("-{}", c)).unwrap_or_default();
        Some(format!("{}/{}/{}/{}-{}{}.jar", group, artifact_id, version, artifact_id, version, suffix))
    }

    /// `group:artifact`, used to deduplicate the classpath.
    pub fn maven_key(&self) -> Option<String> {
        let parts: Vec<&str> = self.name.split(':').collect();
        if parts.len() >= 2 {
            Some(format!("{}:{}", parts[0], parts[1]))
        } else {
            None
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssetIndex {
    pub id: String,
    pub url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssetIndexFile {
    pub objects: HashMap<String, AssetObject>,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssetObject {
    pub hash: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DownloadInfo {
    pub url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VersionDownloads {
    pub client: Option<DownloadInfo>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    pub inherits_from: Option<String>,
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    pub downloads: Option<VersionDownloads>,
    pub asset_index: Option<AssetIndex>,
    pub java_version: Option<JavaVersionInfo>,
}

// --- Launcher-side types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Vanilla,
    Fabric,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Vanilla => write!(f, "Vanilla"),
            Channel::Fabric => write!(f, "Fabric"),
        }
    }
}

/// What the picker knows about a version. For `Channel::Fabric` the id is
/// the Minecraft version Fabric goes on top of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub id: String,
    pub channel: Channel,
    pub release_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub label: String,
    pub descriptor: VersionDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub username: String,
    pub uuid: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProgress {
    pub current: u64,
    pub max: u64,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maven_path_with_classifier() {
        let lib = Library {
            name: "org.lwjgl:lwjgl:3.3.1:natives-linux".to_string(),
            downloads: None,
            natives: None,
            rules: None,
            extract: None,
            url: None,
        };
        assert_eq!(
            lib.maven_path().as_deref(),
            Some("org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar")
        );
        assert_eq!(lib.maven_key().as_deref(), Some("org.lwjgl:lwjgl"));
    }

    #[test]
    fn test_fabric_version_json_parses() {
        let json = r#"{
            "id": "fabric-loader-0.15.0-1.20.1",
            "inheritsFrom": "1.20.1",
            "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
            "libraries": [
                { "name": "net.fabricmc:sponge-mixin:0.12.5+mixin.0.8.5", "url": "https://maven.fabricmc.net/" }
            ]
        }"#;
        let v: VersionJson = serde_json::from_str(json).unwrap();
        assert_eq!(v.inherits_from.as_deref(), Some("1.20.1"));
        assert_eq!(v.libraries[0].url.as_deref(), Some("https://maven.fabricmc.net/"));
        assert!(v.downloads.is_none());
    }
}
