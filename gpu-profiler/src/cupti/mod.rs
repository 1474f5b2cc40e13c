//! CUDA CUPTI integration

pub mod api;
pub mod bindings;
#[cfg(feature = "cuda")]
pub mod events;
