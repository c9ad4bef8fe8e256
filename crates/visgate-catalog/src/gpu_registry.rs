//! Static GPU tier catalog (spec.md §4.3).

use std::sync::LazyLock;

use visgate_types::GpuSpec;

static REGISTRY: LazyLock<Vec<GpuSpec>> = LazyLock::new(|| {
    let mut tiers = vec![
        GpuSpec {
            tier_id: "NVIDIA RTX 3070".to_string(),
            display_name: "RTX3070".to_string(),
            vram_gb: 8,
            cost_index: 1,
            family: "ampere".to_string(),
            aliases: vec!["RTX3070".to_string(), "3070".to_string()],
        },
        GpuSpec {
            tier_id: "NVIDIA RTX 4000 Ada".to_string(),
            display_name: "RTX4000".to_string(),
            vram_gb: 20,
            cost_index: 2,
            family: "ada".to_string(),
            aliases: vec!["RTX4000".to_string(), "4000".to_string()],
        },
        GpuSpec {
            tier_id: "NVIDIA A10".to_string(),
            display_name: "A10".to_string(),
            vram_gb: 24,
            cost_index: 3,
            family: "ampere".to_string(),
            aliases: vec!["A10".to_string(), "A10G".to_string()],
        },
        GpuSpec {
            tier_id: "NVIDIA A40".to_string(),
            display_name: "A40".to_string(),
            vram_gb: 48,
            cost_index: 4,
            family: "ampere".to_string(),
            aliases: vec!["A40".to_string()],
        },
        GpuSpec {
            tier_id: "NVIDIA L40S".to_string(),
            display_name: "L40S".to_string(),
            vram_gb: 48,
            cost_index: 5,
            family: "ada".to_string(),
            aliases: vec!["L40S".to_string(), "L40".to_string()],
        },
        GpuSpec {
            tier_id: "NVIDIA A100 80GB".to_string(),
            display_name: "A100".to_string(),
            vram_gb: 80,
            cost_index: 6,
            family: "ampere".to_string(),
            aliases: vec!["A100".to_string(), "A100-80GB".to_string()],
        },
        GpuSpec {
            tier_id: "NVIDIA H100 80GB".to_string(),
            display_name: "H100".to_string(),
            vram_gb: 80,
            cost_index: 7,
            family: "hopper".to_string(),
            aliases: vec!["H100".to_string()],
        },
    ];
    tiers.sort_by(|a, b| a.cost_index.cmp(&b.cost_index));
    tiers
});

/// All tiers, ordered by `cost_index` ascending.
#[must_use]
pub fn all_tiers() -> &'static [GpuSpec] {
    &REGISTRY
}

/// Resolve a user-supplied tier alias, case-insensitively, against tier
/// ids, display names, and alias lists.
#[must_use]
pub fn resolve_alias(alias: &str) -> Option<&'static GpuSpec> {
    let needle = alias.to_ascii_lowercase();
    REGISTRY.iter().find(|spec| {
        spec.tier_id.eq_ignore_ascii_case(&needle)
            || spec.display_name.eq_ignore_ascii_case(&needle)
            || spec
                .aliases
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_cost_ordered() {
        let tiers = all_tiers();
        for pair in tiers.windows(2) {
            assert!(pair[0].cost_index <= pair[1].cost_index);
        }
    }

    #[test]
    fn resolves_case_insensitively() {
        assert_eq!(resolve_alias("a10").unwrap().display_name, "A10");
        assert_eq!(resolve_alias("A10").unwrap().display_name, "A10");
        assert_eq!(resolve_alias("A10G").unwrap().display_name, "A10");
    }

    #[test]
    fn unknown_alias_resolves_to_none() {
        assert!(resolve_alias("not-a-real-tier").is_none());
    }
}
