use sprinkles_mask::asset::ParticleMaskAsset;
use sprinkles_mask::asset::versioning::{
    VersionStatus, can_auto_upgrade, current_format_version, validate_version,
};

fn asset_with_version(version: &str) -> ParticleMaskAsset {
    let source = format!(r#"(sprinkles_mask_version: "{version}", name: "Versioned", emitters: [])"#);
    ron::de::from_str(&source).expect("deserialize")
}

#[test]
fn current_version_is_current() {
    assert_eq!(current_format_version(), "0.1");
    assert_eq!(validate_version("0.1"), VersionStatus::Current);
}

#[test]
fn unrecognized_version_is_unknown() {
    assert_eq!(validate_version("0.0"), VersionStatus::Unknown);
    assert_eq!(validate_version("9.0"), VersionStatus::Unknown);
    assert_eq!(validate_version(""), VersionStatus::Unknown);
}

#[test]
fn auto_upgrade_needs_two_known_versions_in_order() {
    assert!(!can_auto_upgrade("0.1", "0.1"));
    assert!(!can_auto_upgrade("0.0", "0.1"));
    assert!(!can_auto_upgrade("0.1", "1.0"));
}

#[test]
fn new_assets_use_the_current_version() {
    let asset = ParticleMaskAsset::new("New".into(), Default::default(), vec![]);
    assert_eq!(asset.version(), current_format_version());
}

#[test]
fn current_asset_is_left_alone() {
    let mut asset = asset_with_version("0.1");

    assert_eq!(asset.try_upgrade_version(), VersionStatus::Current);
    assert_eq!(asset.version(), "0.1");
}

#[test]
fn unknown_asset_keeps_its_version() {
    let mut asset = asset_with_version("9.0");

    assert_eq!(asset.try_upgrade_version(), VersionStatus::Unknown);
    assert_eq!(asset.version(), "9.0");
}

#[test]
fn only_current_and_outdated_statuses_are_loadable() {
    assert!(validate_version("0.1").is_loadable());
    assert!(!validate_version("9.0").is_loadable());

    let outdated = VersionStatus::Outdated {
        found: "0.0".into(),
        current: current_format_version(),
    };
    let incompatible = VersionStatus::Incompatible {
        found: "0.0".into(),
        current: current_format_version(),
    };
    assert!(outdated.is_loadable());
    assert!(!incompatible.is_loadable());
}
