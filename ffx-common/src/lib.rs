//! # Francoflex Common Library
//!
//! Shared code for the Francoflex services:
//! - Common error type
//! - TOML bootstrap configuration and config file resolution
//! - Logging initialisation
//! - CEFR levels and the score-to-level band table

pub mod cefr;
pub mod config;
pub mod error;
pub mod logging;

pub use cefr::{CefrBand, CefrBands, CefrLevel};
pub use error::{Error, Result};
