//! Static model/GPU catalogs, VRAM estimation, and GPU tier selection.
//!
//! Four of the ten spec.md components live here because they are all
//! small, read-only, and have no suspension points: the Model Registry,
//! the VRAM Estimator, the GPU Registry, and the GPU Selector.

pub mod gpu_registry;
pub mod model_registry;
pub mod selector;
pub mod vram_estimator;

pub use selector::{select_candidates, SelectorError};
pub use vram_estimator::{estimate_min_vram_gb, EstimatorError, ParameterMap};
