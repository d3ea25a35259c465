//! Face capability: Euclidean distance against a fixed tolerance

use std::sync::Arc;

use async_trait::async_trait;
use biogate_core::{FeatureVector, Modality};

use crate::capability::{comparable, Extraction, MatchOutcome, ModalityCapability, SampleSignals};
use crate::error::ExtractionError;
use crate::extractor::FeatureExtractor;

pub struct FaceCapability {
    extractor: Arc<dyn FeatureExtractor>,
    tolerance: f64,
}

impl FaceCapability {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, tolerance: f64) -> Self {
        Self { extractor, tolerance }
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// Face-to-image area ratio, penalizing faces that are too small (< 10%)
/// or fill too much of the frame (> 60%)
fn face_quality(face_area: f64, image_area: f64) -> f64 {
    if image_area <= 0.0 || face_area <= 0.0 {
        return 0.0;
    }
    let ratio = face_area / image_area;
    let score = if ratio < 0.1 {
        ratio * 5.0
    } else if ratio > 0.6 {
        (1.0 - ratio) * 2.5
    } else {
        1.0
    };
    score.clamp(0.0, 1.0)
}

#[async_trait]
impl ModalityCapability for FaceCapability {
    fn modality(&self) -> Modality {
        Modality::Face
    }

    async fn extract(&self, sample: &[u8]) -> Result<Extraction, ExtractionError> {
        self.extractor.extract(Modality::Face, sample).await
    }

    fn compare(&self, enrolled: &FeatureVector, candidate: &FeatureVector) -> MatchOutcome {
        let Some((enrolled, candidate)) = comparable(enrolled, candidate) else {
            return MatchOutcome::no_match();
        };
        let distance = euclidean_distance(&enrolled, &candidate);
        if !distance.is_finite() {
            return MatchOutcome::no_match();
        }
        MatchOutcome {
            is_match: distance <= self.tolerance,
            similarity: (1.0 - distance).clamp(0.0, 1.0),
        }
    }

    fn quality_score(&self, extraction: &Extraction) -> f64 {
        match extraction.signals {
            Some(SampleSignals::Face { face_area, image_area }) => face_quality(face_area, image_area),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PrecomputedExtractor;

    fn capability() -> FaceCapability {
        FaceCapability::new(Arc::new(PrecomputedExtractor::new()), 0.6)
    }

    #[test]
    fn test_identical_vectors_match() {
        let v = FeatureVector::from_f64(vec![0.1; 128]);
        let outcome = capability().compare(&v, &v);
        assert!(outcome.is_match);
        assert_eq!(outcome.similarity, 1.0);
    }

    #[test]
    fn test_distance_at_tolerance() {
        let a = FeatureVector::from_f64(vec![0.0, 0.0]);
        let near = FeatureVector::from_f64(vec![0.3, 0.4]); // distance 0.5
        let far = FeatureVector::from_f64(vec![0.6, 0.8]); // distance 1.0

        let outcome = capability().compare(&a, &near);
        assert!(outcome.is_match);
        assert!((outcome.similarity - 0.5).abs() < 1e-12);

        let outcome = capability().compare(&a, &far);
        assert!(!outcome.is_match);
        assert_eq!(outcome.similarity, 0.0);
    }

    #[test]
    fn test_length_mismatch_never_matches() {
        let a = FeatureVector::from_f64(vec![0.0; 128]);
        let b = FeatureVector::from_f64(vec![0.0; 64]);
        assert_eq!(capability().compare(&a, &b), MatchOutcome::no_match());
    }

    #[test]
    fn test_quality_heuristic() {
        assert_eq!(face_quality(2_000.0, 10_000.0), 1.0);
        assert!((face_quality(500.0, 10_000.0) - 0.25).abs() < 1e-12);
        assert!((face_quality(8_000.0, 10_000.0) - 0.5).abs() < 1e-12);
        assert_eq!(face_quality(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_quality_without_signals_is_zero() {
        let extraction = Extraction {
            vector: FeatureVector::from_f64(vec![1.0]),
            signals: None,
        };
        assert_eq!(capability().quality_score(&extraction), 0.0);
    }
}
