//! Read-only catalog entry types, shared between `visgate-catalog` and
//! anything that needs to talk about a model or GPU tier (the engine,
//! the API layer's response bodies).

use serde::{Deserialize, Serialize};

/// A registered model's known footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub hf_model_id: String,
    pub pipeline_tag: String,
    pub min_vram_gb: u32,
    pub notes: String,
}

/// A GPU tier offered by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuSpec {
    /// Provider-native tier id.
    pub tier_id: String,
    /// Short display alias, e.g. `A10`.
    pub display_name: String,
    pub vram_gb: u32,
    /// Ascending cost ordinal — cheaper tiers sort first.
    pub cost_index: u32,
    pub family: String,
    /// Case-insensitively matched user-input aliases.
    pub aliases: Vec<String>,
}
