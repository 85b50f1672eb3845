use anyhow::Result;
use tracing::info;

use crate::backend::GameBackend;
use crate::models::{Channel, FabricGameVersion, InstalledVersion, MinecraftVersion, VersionDescriptor, VersionEntry};

/// Release versions first, then stable Fabric targets, each in source order.
pub fn build_catalog(releases: Vec<MinecraftVersion>, fabric: Vec<FabricGameVersion>) -> Vec<VersionEntry> {
    let vanilla = releases
        .into_iter()
        .filter(|v| v.version_type == "release")
        .map(|v| VersionEntry {
            label: format!("{} {}", Channel::Vanilla, v.id),
            descriptor: VersionDescriptor {
                id: v.id,
                channel: Channel::Vanilla,
                release_time: v.release_time,
            },
        });

    let fabric = fabric.into_iter().filter(|f| f.stable).map(|f| VersionEntry {
        label: format!("{} {}", Channel::Fabric, f.version),
        descriptor: VersionDescriptor {
            id: f.version,
            channel: Channel::Fabric,
            release_time: None,
        },
    });

    vanilla.chain(fabric).collect()
}

pub fn load_catalog<B: GameBackend>(backend: &B) -> Result<Vec<VersionEntry>> {
    let releases = backend.release_versions()?;
    let fabric = backend.fabric_game_versions()?;
    let entries = build_catalog(releases, fabric);
    info!("Loaded {} selectable versions", entries.len());
    Ok(entries)
}

/// Finds an entry by exact label, or by version id (Vanilla wins on ties).
pub fn find_entry(entries: &[VersionEntry], query: &str) -> Option<usize> {
    entries
        .iter()
        .position(|e| e.label == query)
        .or_else(|| entries.iter().position(|e| e.descriptor.id == query))
}

/// Newest installed id whose part after the last `-` is `minecraft_version`,
/// e.g. `fabric-loader-0.15.0-1.20.1` for `1.20.1`. Ids without a `-`
/// (plain Vanilla installs) never match.
pub fn find_fabric_build(installed: &[InstalledVersion], minecraft_version: &str) -> Option<String> {
    installed
        .iter()
        .rev()
        .find(|v| {
            v.id.rsplit_once('-')
                .is_some_and(|(_, suffix)| suffix == minecraft_version)
        })
        .map(|v| v.id.clone())
}
