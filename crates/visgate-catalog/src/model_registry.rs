//! Static model registry (spec.md §4.1).
//!
//! A handful of well-known diffusion models, seeded once and never
//! reloaded at runtime. Unknown model ids are not an error here — the
//! caller falls back to the VRAM estimator.

use std::collections::HashMap;
use std::sync::LazyLock;

use visgate_types::ModelSpec;

static REGISTRY: LazyLock<HashMap<String, ModelSpec>> = LazyLock::new(|| {
    let entries = [
        ModelSpec {
            hf_model_id: "stabilityai/sd-turbo".to_string(),
            pipeline_tag: "text-to-image".to_string(),
            min_vram_gb: 8,
            notes: "Distilled SD for single-step inference".to_string(),
        },
        ModelSpec {
            hf_model_id: "stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            pipeline_tag: "text-to-image".to_string(),
            min_vram_gb: 12,
            notes: "SDXL base, no refiner".to_string(),
        },
        ModelSpec {
            hf_model_id: "runwayml/stable-diffusion-v1-5".to_string(),
            pipeline_tag: "text-to-image".to_string(),
            min_vram_gb: 6,
            notes: "Classic SD1.5 checkpoint".to_string(),
        },
        ModelSpec {
            hf_model_id: "black-forest-labs/FLUX.1-dev".to_string(),
            pipeline_tag: "text-to-image".to_string(),
            min_vram_gb: 28,
            notes: "Full-precision FLUX dev weights".to_string(),
        },
        ModelSpec {
            hf_model_id: "black-forest-labs/FLUX.1-schnell".to_string(),
            pipeline_tag: "text-to-image".to_string(),
            min_vram_gb: 24,
            notes: "Distilled FLUX for fast inference".to_string(),
        },
    ];

    entries
        .into_iter()
        .map(|spec| (spec.hf_model_id.clone(), spec))
        .collect()
});

/// Look up a model by its exact Hugging Face id. Lookup is O(1).
#[must_use]
pub fn lookup(hf_model_id: &str) -> Option<ModelSpec> {
    REGISTRY.get(hf_model_id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_is_found() {
        let spec = lookup("stabilityai/sd-turbo").expect("registered");
        assert_eq!(spec.min_vram_gb, 8);
    }

    #[test]
    fn unknown_model_returns_none() {
        assert!(lookup("org/custom-unregistered-model").is_none());
    }
}
