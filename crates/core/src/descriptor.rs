//! Biometric descriptors
//!
//! A `FeatureVector` is the plaintext numeric descriptor produced by an
//! extractor. It exists only in memory; what gets persisted is a
//! `BiometricDescriptor` holding the ciphertext plus the (non-secret)
//! shape and element type needed to decode it again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::CoreError;
use crate::principal::PrincipalId;

/// Kind of biometric signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Modality {
    Face,
    Voice,
    /// Reserved; no verifier capability exists for it
    Fingerprint,
}

/// Element type of a feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementType {
    F32,
    F64,
}

impl ElementType {
    /// Size of one element in bytes
    pub fn size(&self) -> usize {
        match self {
            ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }
}

/// Typed element storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureData {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl FeatureData {
    fn len(&self) -> usize {
        match self {
            FeatureData::F32(v) => v.len(),
            FeatureData::F64(v) => v.len(),
        }
    }
}

/// Plaintext feature vector with its logical shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    shape: Vec<usize>,
    data: FeatureData,
}

/// Number of elements a shape describes (an empty shape is a scalar)
fn element_count(shape: &[usize]) -> Result<usize, CoreError> {
    shape
        .iter()
        .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
        .ok_or_else(|| CoreError::ShapeOverflow { shape: shape.to_vec() })
}

impl FeatureVector {
    /// Build a vector, checking that the shape matches the element count
    pub fn new(shape: Vec<usize>, data: FeatureData) -> Result<Self, CoreError> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(CoreError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional f64 vector
    pub fn from_f64(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: FeatureData::F64(values),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn element_type(&self) -> ElementType {
        match self.data {
            FeatureData::F32(_) => ElementType::F32,
            FeatureData::F64(_) => ElementType::F64,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Widen to f64 for comparison (lossless for f32)
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            FeatureData::F32(v) => v.iter().map(|x| f64::from(*x)).collect(),
            FeatureData::F64(v) => v.clone(),
        }
    }

    /// Raw little-endian element bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match &self.data {
            FeatureData::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            FeatureData::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// Rebuild a vector from raw little-endian bytes, shape and element type
    pub fn from_le_bytes(
        bytes: &[u8],
        shape: &[usize],
        element_type: ElementType,
    ) -> Result<Self, CoreError> {
        let elements = element_count(shape)?;
        if elements.checked_mul(element_type.size()) != Some(bytes.len()) {
            return Err(CoreError::PayloadSize {
                element_type: element_type.to_string(),
                elements,
                actual: bytes.len(),
            });
        }

        let data = match element_type {
            ElementType::F32 => FeatureData::F32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ElementType::F64 => FeatureData::F64(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
        };

        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }
}

/// Encrypted descriptor row
///
/// At most one active descriptor exists per (principal, modality).
#[derive(Clone, PartialEq)]
pub struct BiometricDescriptor {
    pub id: i64,
    pub principal: PrincipalId,
    pub modality: Modality,
    /// Self-contained ciphertext (nonce included)
    pub ciphertext: Vec<u8>,
    pub shape: Vec<usize>,
    pub element_type: ElementType,
    pub quality_score: f64,
    pub enrolled_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl std::fmt::Debug for BiometricDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiometricDescriptor")
            .field("id", &self.id)
            .field("principal", &self.principal)
            .field("modality", &self.modality)
            .field("ciphertext", &format_args!("<{} bytes>", self.ciphertext.len()))
            .field("shape", &self.shape)
            .field("element_type", &self.element_type)
            .field("quality_score", &self.quality_score)
            .field("enrolled_at", &self.enrolled_at)
            .field("last_used_at", &self.last_used_at)
            .field("is_active", &self.is_active)
            .finish()
    }
}
