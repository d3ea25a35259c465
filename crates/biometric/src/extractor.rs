//! Feature extraction boundary

use async_trait::async_trait;
use biogate_core::{ElementType, FeatureData, FeatureVector, Modality};
use serde::{Deserialize, Serialize};

use crate::capability::{Extraction, SampleSignals};
use crate::error::ExtractionError;

/// External feature extractor
///
/// Implementations may call out to a model server or run CPU-heavy work;
/// callers never hold a store lock across `extract`.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, modality: Modality, sample: &[u8]) -> Result<Extraction, ExtractionError>;
}

/// Wire format of a pre-extracted sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedSample {
    pub vector: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SampleSignals>,
}

impl PrecomputedSample {
    pub fn new(vector: Vec<f64>) -> Self {
        Self {
            vector,
            shape: None,
            element_type: None,
            signals: None,
        }
    }

    pub fn with_signals(mut self, signals: SampleSignals) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Reads samples already reduced to feature vectors (JSON, see
/// [`PrecomputedSample`])
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedExtractor;

impl PrecomputedExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse(modality: Modality, sample: &[u8]) -> Result<Extraction, ExtractionError> {
        let parsed: PrecomputedSample =
            serde_json::from_slice(sample).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

        if parsed.vector.is_empty() {
            return Err(ExtractionError::NoSignal(modality));
        }

        match (modality, parsed.signals) {
            (Modality::Face, Some(SampleSignals::Voice { .. }))
            | (Modality::Voice, Some(SampleSignals::Face { .. })) => {
                return Err(ExtractionError::Unreadable(format!(
                    "signals do not describe a {} sample",
                    modality
                )));
            }
            _ => {}
        }

        let shape = parsed.shape.unwrap_or_else(|| vec![parsed.vector.len()]);
        let data = match parsed.element_type.unwrap_or(ElementType::F64) {
            ElementType::F64 => FeatureData::F64(parsed.vector),
            ElementType::F32 => FeatureData::F32(parsed.vector.iter().map(|v| *v as f32).collect()),
        };
        let vector = FeatureVector::new(shape, data).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

        Ok(Extraction {
            vector,
            signals: parsed.signals,
        })
    }
}

#[async_trait]
impl FeatureExtractor for PrecomputedExtractor {
    async fn extract(&self, modality: Modality, sample: &[u8]) -> Result<Extraction, ExtractionError> {
        if modality == Modality::Fingerprint {
            return Err(ExtractionError::Unsupported(modality));
        }
        Self::parse(modality, sample)
    }
}
