//! HTTP API handlers for ffx-pa

pub mod analysis;
pub mod audio;
pub mod health;
pub mod practice;

pub use analysis::analysis_routes;
pub use audio::audio_routes;
pub use health::health_routes;
pub use practice::practice_routes;
