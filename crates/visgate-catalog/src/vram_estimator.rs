//! VRAM estimation for models without a registry entry (spec.md §4.2).

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Tiers the estimate snaps upward to, ascending.
const SNAP_TIERS_GB: [u32; 10] = [6, 8, 10, 12, 16, 24, 28, 40, 48, 80];

/// Activations, CUDA context, and allocator fragmentation overhead.
const OVERHEAD_MULTIPLIER: f64 = 1.35;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EstimatorError {
    #[error("no parameter map supplied and model is not registered")]
    NoParameterMap,
    #[error("unrecognized dtype: {0}")]
    UnknownDtype(String),
}

/// Bytes-per-parameter for a `safetensors` dtype tag.
fn bytes_per_param(dtype: &str) -> Result<f64, EstimatorError> {
    match dtype {
        "F64" | "INT64" => Ok(8.0),
        "F32" | "INT32" => Ok(4.0),
        "F16" | "BF16" | "INT16" => Ok(2.0),
        "F8_E4M3" | "F8_E5M2" | "INT8" | "UINT8" | "BOOL" => Ok(1.0),
        other => Err(EstimatorError::UnknownDtype(other.to_string())),
    }
}

/// `{dtype -> parameter_count}`, as found under a Hugging Face model's
/// `safetensors.parameters` field.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap(pub HashMap<String, u64>);

impl ParameterMap {
    /// Parse the raw `safetensors.parameters` JSON object. Dtypes with a
    /// zero parameter count are kept (they must not change the estimate).
    #[must_use]
    pub fn from_safetensors_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let mut map = HashMap::new();
        for (dtype, count) in obj {
            let count = count.as_u64()?;
            map.insert(dtype.clone(), count);
        }
        Some(Self(map))
    }
}

/// Compute the minimum VRAM, in GB, snapped up to the nearest supported
/// tier. Returns `NoParameterMap` if the map is empty — callers should
/// treat that the same as "model not registered" (`UnsupportedModelError`
/// per spec.md §4.2).
pub fn estimate_min_vram_gb(params: &ParameterMap) -> Result<u32, EstimatorError> {
    if params.0.is_empty() {
        return Err(EstimatorError::NoParameterMap);
    }

    let mut total_bytes = 0.0_f64;
    for (dtype, count) in &params.0 {
        let per_param = bytes_per_param(dtype)?;
        total_bytes += per_param * (*count as f64);
    }

    let with_overhead = total_bytes * OVERHEAD_MULTIPLIER;
    let raw_gb = with_overhead / BYTES_PER_GIB;
    let snapped = SNAP_TIERS_GB
        .into_iter()
        .find(|&tier| f64::from(tier) >= raw_gb)
        .unwrap_or(*SNAP_TIERS_GB.last().unwrap());

    Ok(snapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, u64)]) -> ParameterMap {
        ParameterMap(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn empty_map_is_unsupported() {
        assert_eq!(
            estimate_min_vram_gb(&ParameterMap::default()),
            Err(EstimatorError::NoParameterMap)
        );
    }

    #[test]
    fn unknown_dtype_errors() {
        let p = params(&[("WEIRD", 1_000_000)]);
        assert!(matches!(
            estimate_min_vram_gb(&p),
            Err(EstimatorError::UnknownDtype(_))
        ));
    }

    /// Scenario 3 from spec.md §8: BF16 2B + F32 50M params snaps to 8GB.
    #[test]
    fn custom_model_snaps_to_8gb() {
        let p = params(&[("BF16", 2_000_000_000), ("F32", 50_000_000)]);
        assert_eq!(estimate_min_vram_gb(&p).unwrap(), 8);
    }

    #[test]
    fn adding_zero_param_dtype_does_not_change_tier() {
        let base = params(&[("BF16", 2_000_000_000), ("F32", 50_000_000)]);
        let with_zero = params(&[
            ("BF16", 2_000_000_000),
            ("F32", 50_000_000),
            ("INT8", 0),
        ]);
        assert_eq!(
            estimate_min_vram_gb(&base).unwrap(),
            estimate_min_vram_gb(&with_zero).unwrap()
        );
    }

    #[test]
    fn huge_model_snaps_to_largest_tier() {
        // ~70B params in BF16 comfortably exceeds the 80GB ceiling.
        let p = params(&[("BF16", 70_000_000_000)]);
        assert_eq!(estimate_min_vram_gb(&p).unwrap(), 80);
    }

    #[test]
    fn from_safetensors_json_parses_object() {
        let value = serde_json::json!({"BF16": 2_000_000_000u64, "F32": 50_000_000u64});
        let parsed = ParameterMap::from_safetensors_json(&value).unwrap();
        assert_eq!(parsed.0.len(), 2);
    }
}
