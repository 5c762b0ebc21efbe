use crate::models::{
    DetectedType, Loader, MigrationDetection, ModComparison, ModsValidationResult,
    WorldValidationResult,
};

pub const MODDED_WITHOUT_MODS_REASON: &str =
    "This world looks modded, but no mods were provided. Add the server's mods folder or modpack so modded blocks and items are not lost.";

/// Turns a world validation into a loader/version profile.
///
/// Returns `None` for missing or invalid results so nothing downstream runs on
/// unvalidated data.
pub fn detect_profile(world: Option<&WorldValidationResult>) -> Option<MigrationDetection> {
    let world = world.filter(|world| world.valid)?;
    let modded = world.detected_type == Some(DetectedType::Forge);
    let loader = if modded { Loader::Forge } else { Loader::Vanilla };
    let version = world
        .detected_version
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    Some(MigrationDetection {
        loader,
        version,
        modded,
    })
}

/// Shallow check: flags a modded world that has no valid mods source yet.
pub fn compare_world_to_mods(
    world: Option<&WorldValidationResult>,
    mods: Option<&ModsValidationResult>,
) -> ModComparison {
    let modded = detect_profile(world).is_some_and(|profile| profile.modded);
    if !modded {
        return ModComparison::default();
    }

    let has_mods = mods.is_some_and(|mods| mods.valid);
    if has_mods {
        return ModComparison::default();
    }

    ModComparison {
        mismatch: true,
        reason: Some(MODDED_WITHOUT_MODS_REASON.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    fn world(valid: bool, detected_type: Option<DetectedType>, version: Option<&str>) -> WorldValidationResult {
        WorldValidationResult {
            valid,
            source_kind: SourceKind::Folder,
            world_name: "world".to_string(),
            world_path: "/worlds/world".to_string(),
            staged_path: None,
            size_bytes: 1024,
            has_level_dat: true,
            has_region: true,
            has_playerdata: true,
            has_data: true,
            has_dim_nether: false,
            has_dim_end: false,
            detected_version: version.map(str::to_string),
            detected_type,
        }
    }

    fn mods(valid: bool) -> ModsValidationResult {
        ModsValidationResult {
            valid,
            source_kind: SourceKind::Folder,
            mods_path: "/mods".to_string(),
            staged_path: None,
            mod_count: 12,
            detected_pack: None,
        }
    }

    #[test]
    fn invalid_or_missing_world_has_no_profile() {
        assert_eq!(detect_profile(None), None);
        let invalid = world(false, Some(DetectedType::Forge), Some("1.20.1"));
        assert_eq!(detect_profile(Some(&invalid)), None);
    }

    #[test]
    fn unknown_type_defaults_to_vanilla() {
        let unknown = world(true, None, None);
        let profile = detect_profile(Some(&unknown)).unwrap();
        assert_eq!(profile.loader, Loader::Vanilla);
        assert!(!profile.modded);
        assert_eq!(profile.version, None);
    }

    #[test]
    fn forge_world_is_modded_and_version_is_trimmed() {
        let forge = world(true, Some(DetectedType::Forge), Some("  1.20.1 \n"));
        let profile = detect_profile(Some(&forge)).unwrap();
        assert_eq!(profile.loader, Loader::Forge);
        assert!(profile.modded);
        assert_eq!(profile.version.as_deref(), Some("1.20.1"));
    }

    #[test]
    fn blank_version_becomes_none() {
        let blank = world(true, Some(DetectedType::Vanilla), Some("   "));
        assert_eq!(detect_profile(Some(&blank)).unwrap().version, None);
    }

    #[test]
    fn no_mismatch_for_vanilla_or_invalid_worlds() {
        let vanilla = world(true, Some(DetectedType::Vanilla), Some("1.20.1"));
        assert!(!compare_world_to_mods(Some(&vanilla), None).mismatch);

        let unknown = world(true, None, None);
        assert!(!compare_world_to_mods(Some(&unknown), None).mismatch);

        let invalid_forge = world(false, Some(DetectedType::Forge), None);
        let comparison = compare_world_to_mods(Some(&invalid_forge), None);
        assert!(!comparison.mismatch);
        assert_eq!(comparison.reason, None);

        assert!(!compare_world_to_mods(None, None).mismatch);
    }

    #[test]
    fn modded_world_without_mods_is_flagged() {
        let forge = world(true, Some(DetectedType::Forge), Some("1.20.1"));
        let comparison = compare_world_to_mods(Some(&forge), None);
        assert!(comparison.mismatch);
        assert!(comparison.reason.is_some());

        let comparison = compare_world_to_mods(Some(&forge), Some(&mods(false)));
        assert!(comparison.mismatch);

        let comparison = compare_world_to_mods(Some(&forge), Some(&mods(true)));
        assert!(!comparison.mismatch);
    }
}
