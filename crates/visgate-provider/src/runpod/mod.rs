mod client;
mod models;

pub use client::{RunPod, RunPodFactory};
