//! Verifier thresholds

use serde::{Deserialize, Serialize};

fn default_face_tolerance() -> f64 {
    0.6
}

fn default_voice_similarity_threshold() -> f64 {
    0.85
}

/// Match thresholds per modality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Maximum Euclidean distance for a face match
    #[serde(default = "default_face_tolerance")]
    pub face_tolerance: f64,

    /// Minimum cosine similarity for a voice match
    #[serde(default = "default_voice_similarity_threshold")]
    pub voice_similarity_threshold: f64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            face_tolerance: default_face_tolerance(),
            voice_similarity_threshold: default_voice_similarity_threshold(),
        }
    }
}
