//! Background expiry sweep

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error};

use crate::gate::ActionGate;

/// Spawn a task that denies overdue pending actions every `period`
///
/// Approval also checks expiry, so the sweep only keeps stored statuses
/// current. Abort the returned handle to stop it.
pub fn spawn_expiry_sweeper(gate: Arc<ActionGate>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            match gate.sweep_expired() {
                Ok(0) => {}
                Ok(count) => debug!("Sweep denied {} expired actions", count),
                Err(e) => error!("Expiry sweep error: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use biogate_audit::AuditEntry;
    use biogate_biometric::{BiometricVerifier, CapabilityRegistry, PrecomputedExtractor, VerifierConfig};
    use biogate_core::{Action, ActionStatus, NewPrincipal, Role};
    use biogate_store::Store;
    use biogate_vault::DescriptorCipher;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_sweeper_demotes_overdue_actions() {
        let store = Arc::new(Store::in_memory().unwrap());
        let cipher = Arc::new(DescriptorCipher::from_key(&[1u8; 32]).unwrap());
        let capabilities =
            CapabilityRegistry::standard(Arc::new(PrecomputedExtractor::new()), &VerifierConfig::default());
        let verifier = Arc::new(BiometricVerifier::new(store.clone(), cipher, capabilities));
        let gate = Arc::new(ActionGate::new(store.clone(), verifier, GateConfig::default()));

        let requester = store
            .insert_principal(&NewPrincipal::new("ops", Role::Operator, true))
            .unwrap();
        let action = Action::new(requester.id, "deploy", "late", HashMap::new(), chrono::Duration::seconds(-5));
        let event = AuditEntry::approval(ActionStatus::Pending, "Action requested: deploy")
            .action(&action.action_id)
            .build();
        store.insert_action(&action, &event).unwrap();

        let handle = spawn_expiry_sweeper(gate.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(gate.get_status(&action.action_id).unwrap().status, ActionStatus::Denied);
    }
}
