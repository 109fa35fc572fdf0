//! CEFR proficiency levels and the score-to-level band table
//!
//! The breakpoints belong to an external scoring rubric that may be revised,
//! so they are data: loaded from `[[cefr_bands]]` in the TOML file, or an
//! equal-width split of the 0-100 range when nothing is configured.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Common European Framework of Reference proficiency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    /// All levels, lowest first
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the band table: scores at or above `min_score` reach `level`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CefrBand {
    pub level: CefrLevel,
    pub min_score: f64,
}

/// Validated score-to-level lookup table
///
/// Invariants: at least one band, the lowest band starts at 0, and both
/// `min_score` and `level` strictly increase from one band to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct CefrBands {
    bands: Vec<CefrBand>,
}

impl CefrBands {
    /// Build a table from configured bands (any order)
    pub fn new(mut bands: Vec<CefrBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::Config("CEFR band table is empty".to_string()));
        }

        for band in &bands {
            if !band.min_score.is_finite() || !(0.0..=100.0).contains(&band.min_score) {
                return Err(Error::Config(format!(
                    "CEFR band {} has min_score {} outside 0-100",
                    band.level, band.min_score
                )));
            }
        }

        bands.sort_by(|a, b| a.min_score.total_cmp(&b.min_score));

        if bands[0].min_score != 0.0 {
            return Err(Error::Config(format!(
                "Lowest CEFR band ({}) must start at 0, found {}",
                bands[0].level, bands[0].min_score
            )));
        }

        for pair in bands.windows(2) {
            if pair[1].min_score <= pair[0].min_score {
                return Err(Error::Config(format!(
                    "CEFR bands {} and {} share min_score {}",
                    pair[0].level, pair[1].level, pair[1].min_score
                )));
            }
            if pair[1].level <= pair[0].level {
                return Err(Error::Config(format!(
                    "CEFR band {} needs a higher min_score than {}",
                    pair[0].level, pair[1].level
                )));
            }
        }

        Ok(Self { bands })
    }

    /// Equal-width split of 0-100 into the six levels
    pub fn uniform() -> Self {
        let width = 100.0 / CefrLevel::ALL.len() as f64;
        let bands = CefrLevel::ALL
            .iter()
            .enumerate()
            .map(|(i, level)| CefrBand {
                level: *level,
                min_score: i as f64 * width,
            })
            .collect();
        Self { bands }
    }

    /// Level reached by `score` (clamped to 0-100)
    pub fn level_for(&self, score: f64) -> CefrLevel {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
        self.bands
            .iter()
            .rev()
            .find(|band| score >= band.min_score)
            .unwrap_or(&self.bands[0])
            .level
    }

    /// Highest level in the table
    pub fn top(&self) -> CefrLevel {
        self.bands[self.bands.len() - 1].level
    }

    pub fn bands(&self) -> &[CefrBand] {
        &self.bands
    }
}

impl Default for CefrBands {
    fn default() -> Self {
        Self::uniform()
    }
}
