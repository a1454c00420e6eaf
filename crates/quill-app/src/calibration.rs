// Style calibration and style samples.
//
// Calibration turns a writing sample into a complete profile. Oracle
// failure is never surfaced: analysis degrades to the error sentinel
// profile and sample generation to a fixed error text.

use quill_core::StyleProfile;
use quill_llm::Oracle;
use thiserror::Error;
use tracing::{info, warn};

use crate::handle::SessionError;

/// Returned in place of a style sample when generation fails.
pub const SAMPLE_ERROR_TEXT: &str = "Error generating style sample.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("sample too short for calibration: {actual} characters, need at least {required}")]
    SampleTooShort { actual: usize, required: usize },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Reject samples shorter than `min_chars` (trimmed, counted in characters).
pub fn check_sample(sample: &str, min_chars: usize) -> Result<(), CalibrationError> {
    let actual = sample.trim().chars().count();
    if actual < min_chars {
        return Err(CalibrationError::SampleTooShort {
            actual,
            required: min_chars,
        });
    }
    Ok(())
}

/// Analyze `sample` into a complete profile. Missing fields take their
/// defaults; a failed analysis yields `StyleProfile::error_sentinel()`.
pub async fn analyze_profile(oracle: &dyn Oracle, sample: &str) -> StyleProfile {
    match oracle.analyze_style(sample).await {
        Ok(raw) => StyleProfile::from_raw(raw),
        Err(e) => {
            warn!("Style analysis failed, using error profile: {}", e);
            StyleProfile::error_sentinel()
        }
    }
}

/// Validate, then analyze. The oracle is not contacted for a rejected sample.
pub async fn calibrate(
    oracle: &dyn Oracle,
    sample: &str,
    min_chars: usize,
) -> Result<StyleProfile, CalibrationError> {
    check_sample(sample, min_chars)?;
    let profile = analyze_profile(oracle, sample).await;
    info!("Calibrated style profile (tone: {})", profile.tone);
    Ok(profile)
}

/// A passage demonstrating `profile`, or `SAMPLE_ERROR_TEXT`.
pub async fn style_sample(oracle: &dyn Oracle, profile: &StyleProfile) -> String {
    match oracle.generate_style_sample(profile).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Style sample generation failed: {}", e);
            SAMPLE_ERROR_TEXT.to_string()
        }
    }
}
