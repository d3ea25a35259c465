//! Voice capability: cosine similarity of MFCC statistics against a fixed
//! threshold

use std::sync::Arc;

use async_trait::async_trait;
use biogate_core::{FeatureVector, Modality};

use crate::capability::{comparable, Extraction, MatchOutcome, ModalityCapability, SampleSignals};
use crate::error::ExtractionError;
use crate::extractor::FeatureExtractor;

pub struct VoiceCapability {
    extractor: Arc<dyn FeatureExtractor>,
    threshold: f64,
}

impl VoiceCapability {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, threshold: f64) -> Self {
        Self { extractor, threshold }
    }
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let similarity = dot / (norm_a * norm_b);
    similarity.is_finite().then_some(similarity)
}

/// Equal-weight blend of a duration score (1-10 s is ideal) and a
/// dynamic-range score
fn voice_quality(duration_secs: f64, dynamic_range: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    let duration_score = if duration_secs < 1.0 {
        duration_secs
    } else if duration_secs > 10.0 {
        10.0 / duration_secs
    } else {
        1.0
    };
    let dynamic_score = (dynamic_range * 2.0).min(1.0);
    (duration_score * 0.5 + dynamic_score * 0.5).clamp(0.0, 1.0)
}

#[async_trait]
impl ModalityCapability for VoiceCapability {
    fn modality(&self) -> Modality {
        Modality::Voice
    }

    async fn extract(&self, sample: &[u8]) -> Result<Extraction, ExtractionError> {
        self.extractor.extract(Modality::Voice, sample).await
    }

    fn compare(&self, enrolled: &FeatureVector, candidate: &FeatureVector) -> MatchOutcome {
        let Some((enrolled, candidate)) = comparable(enrolled, candidate) else {
            return MatchOutcome::no_match();
        };
        match cosine_similarity(&enrolled, &candidate) {
            Some(similarity) => MatchOutcome {
                is_match: similarity >= self.threshold,
                similarity: similarity.clamp(0.0, 1.0),
            },
            None => MatchOutcome::no_match(),
        }
    }

    fn quality_score(&self, extraction: &Extraction) -> f64 {
        match extraction.signals {
            Some(SampleSignals::Voice {
                duration_secs,
                dynamic_range,
            }) => voice_quality(duration_secs, dynamic_range),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PrecomputedExtractor;

    fn capability() -> VoiceCapability {
        VoiceCapability::new(Arc::new(PrecomputedExtractor::new()), 0.85)
    }

    #[test]
    fn test_parallel_vectors_match() {
        let a = FeatureVector::from_f64(vec![1.0, 2.0, 3.0]);
        let b = FeatureVector::from_f64(vec![2.0, 4.0, 6.0]);
        let outcome = capability().compare(&a, &b);
        assert!(outcome.is_match);
        assert!((outcome.similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_orthogonal_vectors_do_not_match() {
        let a = FeatureVector::from_f64(vec![1.0, 0.0]);
        let b = FeatureVector::from_f64(vec![0.0, 1.0]);
        let outcome = capability().compare(&a, &b);
        assert!(!outcome.is_match);
        assert_eq!(outcome.similarity, 0.0);
    }

    #[test]
    fn test_opposite_vectors_clamp_to_zero() {
        let a = FeatureVector::from_f64(vec![1.0, 1.0]);
        let b = FeatureVector::from_f64(vec![-1.0, -1.0]);
        let outcome = capability().compare(&a, &b);
        assert!(!outcome.is_match);
        assert_eq!(outcome.similarity, 0.0);
    }

    #[test]
    fn test_zero_vector_never_matches() {
        let a = FeatureVector::from_f64(vec![0.0, 0.0]);
        let b = FeatureVector::from_f64(vec![1.0, 0.0]);
        assert_eq!(capability().compare(&a, &b), MatchOutcome::no_match());
    }

    #[test]
    fn test_quality_heuristic() {
        assert_eq!(voice_quality(5.0, 0.5), 1.0);
        assert!((voice_quality(0.5, 0.5) - 0.75).abs() < 1e-12);
        assert!((voice_quality(20.0, 0.1) - 0.35).abs() < 1e-12);
        assert_eq!(voice_quality(0.0, 1.0), 0.0);
    }
}
