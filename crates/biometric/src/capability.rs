//! Modality capability interface

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use biogate_core::{FeatureVector, Modality};
use serde::{Deserialize, Serialize};

use crate::config::VerifierConfig;
use crate::error::ExtractionError;
use crate::extractor::FeatureExtractor;
use crate::face::FaceCapability;
use crate::voice::VoiceCapability;

/// Measurements reported by the extractor alongside the vector, used only
/// for quality scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleSignals {
    Face { face_area: f64, image_area: f64 },
    Voice { duration_secs: f64, dynamic_range: f64 },
}

/// Result of feature extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub vector: FeatureVector,
    pub signals: Option<SampleSignals>,
}

/// Result of a 1:1 comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub is_match: bool,
    /// Normalized to [0, 1], higher is more alike
    pub similarity: f64,
}

impl MatchOutcome {
    pub fn no_match() -> Self {
        Self {
            is_match: false,
            similarity: 0.0,
        }
    }
}

/// Everything the verifier needs from one modality
///
/// Adding a modality means adding a `Modality` variant and registering an
/// implementation; the verifier never branches on modality itself.
#[async_trait]
pub trait ModalityCapability: Send + Sync {
    fn modality(&self) -> Modality;

    /// Reduce a raw sample to a feature vector (may be slow)
    async fn extract(&self, sample: &[u8]) -> Result<Extraction, ExtractionError>;

    /// Compare an enrolled vector with a candidate
    fn compare(&self, enrolled: &FeatureVector, candidate: &FeatureVector) -> MatchOutcome;

    /// Sample quality in [0, 1]
    fn quality_score(&self, extraction: &Extraction) -> f64;
}

/// Capabilities by modality
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<Modality, Arc<dyn ModalityCapability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Face and voice over a shared extractor; fingerprint stays unregistered
    pub fn standard(extractor: Arc<dyn FeatureExtractor>, config: &VerifierConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FaceCapability::new(extractor.clone(), config.face_tolerance)));
        registry.register(Arc::new(VoiceCapability::new(
            extractor,
            config.voice_similarity_threshold,
        )));
        registry
    }

    /// Register (or replace) the capability for its modality
    pub fn register(&mut self, capability: Arc<dyn ModalityCapability>) {
        self.capabilities.insert(capability.modality(), capability);
    }

    pub fn get(&self, modality: Modality) -> Option<Arc<dyn ModalityCapability>> {
        self.capabilities.get(&modality).cloned()
    }
}

/// Vectors must agree in length to be compared
pub(crate) fn comparable(enrolled: &FeatureVector, candidate: &FeatureVector) -> Option<(Vec<f64>, Vec<f64>)> {
    if enrolled.len() != candidate.len() || enrolled.is_empty() {
        return None;
    }
    Some((enrolled.to_f64_vec(), candidate.to_f64_vec()))
}
