use serde::{Deserialize, Serialize};

use crate::search::error::{Result, SearchError};

/// How finished hypotheses are ranked against each other.
///
/// `None` ranks by the raw log-probability sum, which favours shorter
/// outputs. The other variants are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LengthNormalization {
    #[default]
    None,
    /// score / length
    Average,
    /// score / ((5 + length) / 6)^alpha  (Wu et al., 2016)
    Gnmt { alpha: f32 },
}

impl LengthNormalization {
    /// `length` counts emitted tokens, not the start token.
    pub fn apply(&self, score: f32, length: usize) -> f32 {
        match *self {
            LengthNormalization::None => score,
            LengthNormalization::Average => score / length.max(1) as f32,
            LengthNormalization::Gnmt { alpha } => {
                score / ((5.0 + length as f32) / 6.0).powf(alpha)
            }
        }
    }
}

/// Parameters of one beam search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamSearchConfig {
    /// Active hypotheses kept per batch element
    pub beam_width: usize,
    /// Finished hypotheses returned per batch element
    pub n_sen: usize,
    /// Maximum number of decoder steps
    pub max_length: usize,
    #[serde(default)]
    pub length_normalization: LengthNormalization,
}

impl BeamSearchConfig {
    pub fn new(beam_width: usize, n_sen: usize, max_length: usize) -> Self {
        Self {
            beam_width,
            n_sen,
            max_length,
            length_normalization: LengthNormalization::None,
        }
    }

    pub fn with_length_normalization(mut self, norm: LengthNormalization) -> Self {
        self.length_normalization = norm;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.beam_width < 1 {
            return Err(SearchError::InvalidConfig(
                "beam_width must be at least 1".to_string(),
            ));
        }
        if self.n_sen < 1 {
            return Err(SearchError::InvalidConfig(
                "n_sen must be at least 1".to_string(),
            ));
        }
        if self.n_sen > self.beam_width {
            return Err(SearchError::InvalidConfig(format!(
                "n_sen ({}) cannot exceed beam_width ({})",
                self.n_sen, self.beam_width
            )));
        }
        if self.max_length < 1 {
            return Err(SearchError::InvalidConfig(
                "max_length must be at least 1".to_string(),
            ));
        }
        if let LengthNormalization::Gnmt { alpha } = self.length_normalization {
            if !alpha.is_finite() {
                return Err(SearchError::InvalidConfig(format!(
                    "length penalty alpha must be finite, got {alpha}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        Self::new(2, 1, 50)
    }
}
