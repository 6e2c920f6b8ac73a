//! Inference backends behind [`InferenceBackend`](crate::InferenceBackend)

pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::{StubBackend, StubStats};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
