use serde::{Deserialize, Serialize};

use crate::models::{ModsValidationResult, WorldValidationResult};

const GIB: u64 = 1024 * 1024 * 1024;

/// Tunables for the RAM suggestion. The defaults are the product's numbers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RamPolicy {
    pub baseline_gb: u32,
    pub mods_per_gb: u32,
    pub large_world_bytes: u64,
    pub large_world_extra_gb: u32,
    pub min_gb: u32,
    pub min_reserved_gb: u32,
}

impl Default for RamPolicy {
    fn default() -> Self {
        Self {
            baseline_gb: 4,
            mods_per_gb: 25,
            large_world_bytes: GIB,
            large_world_extra_gb: 1,
            min_gb: 2,
            min_reserved_gb: 2,
        }
    }
}

/// Ceiling the allocation picker may offer: total memory minus an OS reserve
/// of a quarter of the machine (at least `min_reserved_gb`), never below
/// `min_gb`.
pub fn safe_max_ram_gb(system_ram_gb: u32) -> u32 {
    safe_max_ram_gb_with(&RamPolicy::default(), system_ram_gb)
}

pub fn safe_max_ram_gb_with(policy: &RamPolicy, system_ram_gb: u32) -> u32 {
    let reserve = (system_ram_gb / 4).max(policy.min_reserved_gb);
    system_ram_gb.saturating_sub(reserve).max(policy.min_gb)
}

/// Even GB steps offered by the allocation picker.
pub fn ram_options(safe_max_gb: u32) -> Vec<u32> {
    let options: Vec<u32> = (2..=safe_max_gb).step_by(2).collect();
    if options.is_empty() {
        vec![2]
    } else {
        options
    }
}

/// Recommended allocation for the migrated server.
///
/// Clamping happens before the even rounding, so an odd `safe_max_gb` can be
/// exceeded by one GB (7 becomes 8).
pub fn suggest_ram_gb(
    system_ram_gb: Option<u32>,
    safe_max_gb: u32,
    world: Option<&WorldValidationResult>,
    mods: Option<&ModsValidationResult>,
) -> Option<u32> {
    suggest_ram_gb_with(&RamPolicy::default(), system_ram_gb, safe_max_gb, world, mods)
}

pub fn suggest_ram_gb_with(
    policy: &RamPolicy,
    system_ram_gb: Option<u32>,
    safe_max_gb: u32,
    world: Option<&WorldValidationResult>,
    mods: Option<&ModsValidationResult>,
) -> Option<u32> {
    system_ram_gb?;

    let mut suggested = policy.baseline_gb;
    if let Some(mods) = mods.filter(|mods| mods.valid) {
        suggested = suggested.saturating_add(mods_load_gb(mods.mod_count, policy.mods_per_gb));
    }
    if let Some(world) = world.filter(|world| world.valid) {
        if world.size_bytes > policy.large_world_bytes {
            suggested = suggested.saturating_add(policy.large_world_extra_gb);
        }
    }

    suggested = suggested.max(policy.min_gb).min(safe_max_gb);
    if suggested % 2 == 1 {
        suggested += 1;
    }
    Some(suggested)
}

fn mods_load_gb(mod_count: usize, mods_per_gb: u32) -> u32 {
    if mods_per_gb == 0 || mod_count == 0 {
        return 0;
    }
    let per = mods_per_gb as usize;
    let extra = (mod_count + per - 1) / per;
    u32::try_from(extra).unwrap_or(u32::MAX)
}
