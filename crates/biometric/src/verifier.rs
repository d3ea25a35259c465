//! Enrollment and authentication

use std::sync::Arc;

use biogate_audit::{AuditEntry, AuditRecorder};
use biogate_core::{ActionStatus, Modality, Principal, PrincipalId};
use biogate_store::{DescriptorRecord, Store};
use biogate_vault::DescriptorCipher;
use chrono::{SubsecRound, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::capability::CapabilityRegistry;
use crate::error::{VerifierError, VerifierResult};

/// Result of an enrollment attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollOutcome {
    pub success: bool,
    pub message: String,
    pub quality_score: Option<f64>,
}

impl EnrollOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            quality_score: None,
        }
    }
}

/// Why an authentication could not be completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    Unsupported,
    ConsentRevoked,
    Inactive,
    Extraction,
    NotEnrolled,
    Decryption,
}

/// Result of an authentication attempt
///
/// `success = false` is an operational failure (see `failure`);
/// `success = true, authenticated = false` is a completed check that did
/// not match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub authenticated: bool,
    pub similarity_score: Option<f64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<AuthFailure>,
}

impl AuthOutcome {
    fn failed(failure: AuthFailure, message: impl Into<String>) -> Self {
        Self {
            success: false,
            authenticated: false,
            similarity_score: None,
            message: message.into(),
            failure: Some(failure),
        }
    }
}

fn capitalized(modality: Modality) -> String {
    let name = modality.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}

/// Orchestrates extraction, encryption and comparison for enrolled principals
///
/// The only component that decrypts stored descriptors.
pub struct BiometricVerifier {
    store: Arc<Store>,
    cipher: Arc<DescriptorCipher>,
    capabilities: CapabilityRegistry,
    recorder: AuditRecorder,
}

impl BiometricVerifier {
    pub fn new(store: Arc<Store>, cipher: Arc<DescriptorCipher>, capabilities: CapabilityRegistry) -> Self {
        let recorder = AuditRecorder::new(store.clone());
        Self {
            store,
            cipher,
            capabilities,
            recorder,
        }
    }

    fn principal(&self, id: PrincipalId) -> VerifierResult<Principal> {
        self.store
            .get_principal(id)?
            .ok_or(VerifierError::PrincipalNotFound(id))
    }

    /// Enroll (or re-enroll in place) a principal's descriptor for a modality
    pub async fn enroll(
        &self,
        principal_id: PrincipalId,
        modality: Modality,
        sample: &[u8],
        consent_confirmed: bool,
    ) -> VerifierResult<EnrollOutcome> {
        if !consent_confirmed {
            return Err(VerifierError::Validation(
                "biometric consent must be confirmed for enrollment".to_string(),
            ));
        }
        let principal = self.principal(principal_id)?;
        if !principal.consent_given {
            return Err(VerifierError::Validation(format!(
                "principal {} has not consented to biometric processing",
                principal.id
            )));
        }
        if !principal.is_active {
            return Err(VerifierError::Validation(format!("principal {} is inactive", principal.id)));
        }

        let Some(capability) = self.capabilities.get(modality) else {
            return Ok(EnrollOutcome::failed(format!(
                "Biometric type {} not yet implemented",
                modality
            )));
        };

        let extraction = match capability.extract(sample).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(pseudonym = %principal.pseudonym, %modality, error = %e, "enrollment extraction failed");
                self.recorder.record(
                    AuditEntry::enrollment(modality, ActionStatus::Denied)
                        .actor(&principal)
                        .detail("Failed to extract features")
                        .build(),
                )?;
                return Ok(EnrollOutcome::failed(format!("Failed to extract {} features", modality)));
            }
        };

        let quality = capability.quality_score(&extraction);

        let ciphertext = match self.cipher.encrypt(&extraction.vector) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                warn!(pseudonym = %principal.pseudonym, %modality, error = %e, "descriptor encryption failed");
                self.recorder.record(
                    AuditEntry::enrollment(modality, ActionStatus::Denied)
                        .actor(&principal)
                        .detail("Failed to encrypt descriptor")
                        .build(),
                )?;
                return Ok(EnrollOutcome::failed(format!("Enrollment error: {}", e)));
            }
        };

        let record = DescriptorRecord {
            principal: principal.id,
            modality,
            ciphertext,
            shape: extraction.vector.shape().to_vec(),
            element_type: extraction.vector.element_type(),
            quality_score: quality,
            enrolled_at: Utc::now().trunc_subsecs(6),
        };
        let event = AuditEntry::enrollment(modality, ActionStatus::Approved)
            .actor(&principal)
            .detail(format!("quality score {:.3}", quality))
            .build();
        let descriptor = self.store.upsert_descriptor(&record, &event)?;

        info!(
            pseudonym = %principal.pseudonym,
            %modality,
            descriptor = descriptor.id,
            quality,
            "biometric enrolled"
        );

        Ok(EnrollOutcome {
            success: true,
            message: format!("{} enrolled successfully", capitalized(modality)),
            quality_score: Some(quality),
        })
    }

    /// 1:1 verification of a sample against the principal's active descriptor
    pub async fn authenticate(
        &self,
        principal_id: PrincipalId,
        modality: Modality,
        sample: &[u8],
    ) -> VerifierResult<AuthOutcome> {
        let principal = self.principal(principal_id)?;

        if !principal.may_use_biometrics() {
            let (failure, detail) = if principal.is_active {
                (AuthFailure::ConsentRevoked, "Biometric consent not given")
            } else {
                (AuthFailure::Inactive, "Principal is inactive")
            };
            self.recorder.record(
                AuditEntry::authentication(modality, ActionStatus::Denied)
                    .actor(&principal)
                    .detail(detail)
                    .build(),
            )?;
            return Ok(AuthOutcome::failed(failure, detail));
        }

        let Some(capability) = self.capabilities.get(modality) else {
            self.recorder.record(
                AuditEntry::authentication(modality, ActionStatus::Denied)
                    .actor(&principal)
                    .detail("not yet implemented")
                    .build(),
            )?;
            return Ok(AuthOutcome::failed(
                AuthFailure::Unsupported,
                format!("Biometric type {} not yet implemented", modality),
            ));
        };

        let candidate = match capability.extract(sample).await {
            Ok(extraction) => extraction.vector,
            Err(e) => {
                warn!(pseudonym = %principal.pseudonym, %modality, error = %e, "authentication extraction failed");
                self.recorder.record(
                    AuditEntry::authentication(modality, ActionStatus::Denied)
                        .actor(&principal)
                        .detail("Failed to extract features")
                        .build(),
                )?;
                return Ok(AuthOutcome::failed(
                    AuthFailure::Extraction,
                    format!("Failed to extract {} features", modality),
                ));
            }
        };

        let Some(descriptor) = self.store.active_descriptor(principal.id, modality)? else {
            self.recorder.record(
                AuditEntry::authentication(modality, ActionStatus::Denied)
                    .actor(&principal)
                    .detail("No enrolled biometric data found")
                    .build(),
            )?;
            return Ok(AuthOutcome::failed(
                AuthFailure::NotEnrolled,
                format!("No enrolled {} data found", modality),
            ));
        };

        let enrolled = match self
            .cipher
            .decrypt(&descriptor.ciphertext, &descriptor.shape, descriptor.element_type)
        {
            Ok(vector) => vector,
            Err(e) => {
                warn!(
                    pseudonym = %principal.pseudonym,
                    descriptor = descriptor.id,
                    error = %e,
                    "stored descriptor could not be decrypted"
                );
                self.recorder.record(
                    AuditEntry::authentication(modality, ActionStatus::Denied)
                        .actor(&principal)
                        .detail("Stored descriptor could not be decrypted")
                        .build(),
                )?;
                return Ok(AuthOutcome::failed(
                    AuthFailure::Decryption,
                    format!("Enrolled {} data is unreadable", modality),
                ));
            }
        };

        let outcome = capability.compare(&enrolled, &candidate);
        let (status, message) = if outcome.is_match {
            (ActionStatus::Approved, "Authentication successful")
        } else {
            (ActionStatus::Denied, "Authentication failed")
        };

        let event = AuditEntry::authentication(modality, status)
            .actor(&principal)
            .similarity(Some(outcome.similarity))
            .detail(message)
            .build();
        self.store
            .touch_descriptor(descriptor.id, Utc::now().trunc_subsecs(6), &event)?;

        info!(
            pseudonym = %principal.pseudonym,
            %modality,
            authenticated = outcome.is_match,
            similarity = outcome.similarity,
            "biometric authentication"
        );

        Ok(AuthOutcome {
            success: true,
            authenticated: outcome.is_match,
            similarity_score: Some(outcome.similarity),
            message: message.to_string(),
            failure: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::SampleSignals;
    use crate::config::VerifierConfig;
    use crate::extractor::{PrecomputedExtractor, PrecomputedSample};
    use biogate_audit::AuditQuery;
    use biogate_core::{AuditCategory, NewPrincipal, Role};

    struct Fixture {
        store: Arc<Store>,
        verifier: BiometricVerifier,
        recorder: AuditRecorder,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(Store::in_memory().unwrap());
        let cipher = Arc::new(DescriptorCipher::from_key(&[7u8; 32]).unwrap());
        let capabilities =
            CapabilityRegistry::standard(Arc::new(PrecomputedExtractor::new()), &VerifierConfig::default());
        Fixture {
            verifier: BiometricVerifier::new(store.clone(), cipher, capabilities),
            recorder: AuditRecorder::new(store.clone()),
            store,
        }
    }

    fn face_sample(values: Vec<f64>) -> Vec<u8> {
        PrecomputedSample::new(values)
            .with_signals(SampleSignals::Face {
                face_area: 2_500.0,
                image_area: 10_000.0,
            })
            .to_bytes()
    }

    fn voice_sample(values: Vec<f64>) -> Vec<u8> {
        PrecomputedSample::new(values)
            .with_signals(SampleSignals::Voice {
                duration_secs: 4.0,
                dynamic_range: 0.6,
            })
            .to_bytes()
    }

    fn register(store: &Store, name: &str, consent: bool) -> Principal {
        store.insert_principal(&NewPrincipal::new(name, Role::Operator, consent)).unwrap()
    }

    #[tokio::test]
    async fn test_enroll_then_authenticate_face() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);

        let enrolled = f
            .verifier
            .enroll(alice.id, Modality::Face, &face_sample(vec![0.1; 128]), true)
            .await
            .unwrap();
        assert!(enrolled.success);
        assert_eq!(enrolled.message, "Face enrolled successfully");
        assert_eq!(enrolled.quality_score, Some(1.0));

        let auth = f
            .verifier
            .authenticate(alice.id, Modality::Face, &face_sample(vec![0.11; 128]))
            .await
            .unwrap();
        assert!(auth.success);
        assert!(auth.authenticated);
        assert!(auth.similarity_score.unwrap() >= 0.6);

        let descriptor = f.store.active_descriptor(alice.id, Modality::Face).unwrap().unwrap();
        assert!(descriptor.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_reenroll_updates_in_place() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);

        f.verifier
            .enroll(alice.id, Modality::Voice, &voice_sample(vec![1.0, 0.0, 0.0]), true)
            .await
            .unwrap();
        f.verifier
            .enroll(alice.id, Modality::Voice, &voice_sample(vec![0.0, 1.0, 0.0]), true)
            .await
            .unwrap();

        assert_eq!(f.store.descriptors_for(alice.id).unwrap().len(), 1);

        // Matches only the second enrollment
        let auth = f
            .verifier
            .authenticate(alice.id, Modality::Voice, &voice_sample(vec![0.0, 1.0, 0.0]))
            .await
            .unwrap();
        assert!(auth.authenticated);
    }

    #[tokio::test]
    async fn test_voice_mismatch_is_completed_check() {
        let f = fixture();
        let bob = register(&f.store, "bob", true);
        f.verifier
            .enroll(bob.id, Modality::Voice, &voice_sample(vec![1.0, 0.2, 0.0, 0.4]), true)
            .await
            .unwrap();

        let auth = f
            .verifier
            .authenticate(bob.id, Modality::Voice, &voice_sample(vec![-0.3, 1.0, 0.8, 0.0]))
            .await
            .unwrap();
        assert!(auth.success);
        assert!(!auth.authenticated);
        assert!(auth.similarity_score.unwrap() < 0.85);
        assert_eq!(auth.message, "Authentication failed");
        assert!(auth.failure.is_none());
    }

    #[tokio::test]
    async fn test_enroll_requires_consent() {
        let f = fixture();
        let carol = register(&f.store, "carol", false);

        let unconfirmed = f
            .verifier
            .enroll(carol.id, Modality::Face, &face_sample(vec![0.1; 8]), false)
            .await;
        assert!(matches!(unconfirmed, Err(VerifierError::Validation(_))));

        let no_consent_flag = f
            .verifier
            .enroll(carol.id, Modality::Face, &face_sample(vec![0.1; 8]), true)
            .await;
        assert!(matches!(no_consent_flag, Err(VerifierError::Validation(_))));
        assert!(f.store.descriptors_for(carol.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_principal() {
        let f = fixture();
        let result = f
            .verifier
            .authenticate(PrincipalId(99), Modality::Face, &face_sample(vec![0.1; 8]))
            .await;
        assert!(matches!(result, Err(VerifierError::PrincipalNotFound(PrincipalId(99)))));
    }

    #[tokio::test]
    async fn test_revoked_consent_blocks_authentication() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);
        f.verifier
            .enroll(alice.id, Modality::Face, &face_sample(vec![0.1; 8]), true)
            .await
            .unwrap();
        f.store.set_consent(alice.id, false, Utc::now()).unwrap();

        let auth = f
            .verifier
            .authenticate(alice.id, Modality::Face, &face_sample(vec![0.1; 8]))
            .await
            .unwrap();
        assert!(!auth.success);
        assert_eq!(auth.failure, Some(AuthFailure::ConsentRevoked));
    }

    #[tokio::test]
    async fn test_extraction_failure_is_audited() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);

        let outcome = f
            .verifier
            .enroll(alice.id, Modality::Face, br#"{"vector": []}"#, true)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Failed to extract face features");

        let page = f
            .recorder
            .query(&AuditQuery {
                principal: Some(alice.id),
                category: Some(AuditCategory::Enrollment),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.events[0].status, ActionStatus::Denied);
        assert_eq!(page.events[0].detail.as_deref(), Some("Failed to extract features"));
        assert!(page.events[0].similarity_score.is_none());
    }

    #[tokio::test]
    async fn test_not_enrolled_is_operational_failure() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);

        let auth = f
            .verifier
            .authenticate(alice.id, Modality::Voice, &voice_sample(vec![1.0, 2.0]))
            .await
            .unwrap();
        assert!(!auth.success);
        assert!(!auth.authenticated);
        assert_eq!(auth.failure, Some(AuthFailure::NotEnrolled));
        assert_eq!(auth.message, "No enrolled voice data found");
    }

    #[tokio::test]
    async fn test_wrong_key_surfaces_decryption_failure() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);
        f.verifier
            .enroll(alice.id, Modality::Face, &face_sample(vec![0.1; 8]), true)
            .await
            .unwrap();

        let other_key = Arc::new(DescriptorCipher::from_key(&[9u8; 32]).unwrap());
        let capabilities =
            CapabilityRegistry::standard(Arc::new(PrecomputedExtractor::new()), &VerifierConfig::default());
        let rotated = BiometricVerifier::new(f.store.clone(), other_key, capabilities);

        let auth = rotated
            .authenticate(alice.id, Modality::Face, &face_sample(vec![0.1; 8]))
            .await
            .unwrap();
        assert!(!auth.success);
        assert_eq!(auth.failure, Some(AuthFailure::Decryption));
    }

    #[tokio::test]
    async fn test_fingerprint_not_implemented() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);
        let outcome = f
            .verifier
            .enroll(alice.id, Modality::Fingerprint, b"{}", true)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Biometric type fingerprint not yet implemented");
    }

    #[tokio::test]
    async fn test_fingerprint_authentication_is_audited() {
        let f = fixture();
        let alice = register(&f.store, "alice", true);

        let auth = f
            .verifier
            .authenticate(alice.id, Modality::Fingerprint, b"{}")
            .await
            .unwrap();
        assert!(!auth.success);
        assert!(!auth.authenticated);
        assert_eq!(auth.failure, Some(AuthFailure::Unsupported));

        let page = f
            .recorder
            .query(&AuditQuery {
                principal: Some(alice.id),
                category: Some(AuditCategory::Authentication),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.events[0].status, ActionStatus::Denied);
        assert_eq!(page.events[0].modality, Some(Modality::Fingerprint));
        assert_eq!(page.events[0].detail.as_deref(), Some("not yet implemented"));
    }
}
