//! BioGate Biometric Verifier
//!
//! Enrollment and 1:1 verification of a principal against their stored,
//! encrypted descriptor.
//!
//! Each modality is a [`ModalityCapability`] (extract, compare, quality
//! score). Feature extraction itself is delegated to a [`FeatureExtractor`];
//! the shipped [`PrecomputedExtractor`] reads samples that an upstream
//! pipeline has already reduced to feature vectors.
//!
//! Failures are values: [`EnrollOutcome`] and [`AuthOutcome`] carry a
//! reason, and only validation or storage problems surface as
//! [`VerifierError`].

pub mod capability;
pub mod config;
pub mod error;
pub mod extractor;
pub mod face;
pub mod verifier;
pub mod voice;

pub use capability::{CapabilityRegistry, Extraction, MatchOutcome, ModalityCapability, SampleSignals};
pub use config::VerifierConfig;
pub use error::{ExtractionError, VerifierError};
pub use extractor::{FeatureExtractor, PrecomputedExtractor, PrecomputedSample};
pub use face::FaceCapability;
pub use verifier::{AuthFailure, AuthOutcome, BiometricVerifier, EnrollOutcome};
pub use voice::VoiceCapability;
