//! Generation request parameters and local validation.
//!
//! Validation here is purely local: an empty prompt is rejected before any
//! network call is made.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default sampling step count.
pub const DEFAULT_STEPS: u32 = 20;
/// Default sampler name understood by the backend.
pub const DEFAULT_SAMPLER: &str = "euler_a";
/// Default classifier-free guidance scale.
pub const DEFAULT_CFG_SCALE: f32 = 7.0;
/// Default output dimensions in pixels.
pub const DEFAULT_DIMENSION: u32 = 512;
/// Seed value asking the backend to pick a random seed.
pub const RANDOM_SEED: i64 = -1;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Parameters for a single generation submission.
///
/// Serializes to the backend's submit payload; optional fields are omitted
/// when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub steps: u32,
    pub sampler: String,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub seed: i64,
    pub batch_size: u32,
    pub batch_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denoising_strength: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: None,
            steps: DEFAULT_STEPS,
            sampler: DEFAULT_SAMPLER.to_string(),
            cfg_scale: DEFAULT_CFG_SCALE,
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            seed: RANDOM_SEED,
            batch_size: 1,
            batch_count: 1,
            denoising_strength: None,
        }
    }
}

impl GenerationParams {
    /// Validate the parameters locally, before any backend call.
    ///
    /// The prompt must contain at least one non-whitespace character.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation(
                "Prompt must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_params_have_empty_prompt() {
        let params = GenerationParams::default();
        assert_matches!(params.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn whitespace_prompt_is_rejected() {
        let params = GenerationParams {
            prompt: "   ".to_string(),
            ..Default::default()
        };
        assert_matches!(params.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn non_empty_prompt_is_accepted() {
        let params = GenerationParams {
            prompt: "a cat".to_string(),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn optional_fields_omitted_from_payload() {
        let params = GenerationParams {
            prompt: "a cat".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("negative_prompt").is_none());
        assert!(json.get("denoising_strength").is_none());
        assert_eq!(json["steps"], 20);
        assert_eq!(json["seed"], -1);
    }
}
