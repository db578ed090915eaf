/// One entry in the mask file format history.
struct FormatRevision {
    tag: &'static str,
    /// Assets written before this revision cannot be migrated automatically.
    migration_required: bool,
}

// oldest first. the last entry is what new assets are written with.
const HISTORY: &[FormatRevision] = &[FormatRevision {
    tag: "0.1",
    migration_required: false,
}]; // initial

/// How a mask file's `sprinkles_mask_version` relates to the format this build writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    /// Same format as this build.
    Current,
    /// Older, and every revision since only added fields with defaults.
    Outdated {
        /// Version written in the asset.
        found: String,
        /// Version this build writes.
        current: &'static str,
    },
    /// Older, with a restructuring revision in between.
    Incompatible {
        /// Version written in the asset.
        found: String,
        /// Version this build writes.
        current: &'static str,
    },
    /// Not in the known history, likely written by a newer release.
    Unknown,
}

impl VersionStatus {
    /// Returns `true` if an asset with this status can be used after upgrading.
    pub fn is_loadable(&self) -> bool {
        matches!(self, Self::Current | Self::Outdated { .. })
    }
}

/// Format version written into new assets.
pub fn current_format_version() -> &'static str {
    HISTORY[HISTORY.len() - 1].tag
}

fn position(tag: &str) -> Option<usize> {
    HISTORY.iter().position(|revision| revision.tag == tag)
}

/// Returns `true` if `from` is strictly older than `to` and no revision after `from`
/// up to and including `to` requires a migration.
pub fn can_auto_upgrade(from: &str, to: &str) -> bool {
    match (position(from), position(to)) {
        (Some(start), Some(end)) if start < end => HISTORY[start + 1..=end]
            .iter()
            .all(|revision| !revision.migration_required),
        _ => false,
    }
}

/// Classifies `version` against the format history.
pub fn validate_version(version: &str) -> VersionStatus {
    let current = current_format_version();
    let found = version.to_string();
    match position(version) {
        None => VersionStatus::Unknown,
        Some(_) if version == current => VersionStatus::Current,
        Some(_) if can_auto_upgrade(version, current) => VersionStatus::Outdated { found, current },
        Some(_) => VersionStatus::Incompatible { found, current },
    }
}
