//! CLI commands

use std::collections::HashMap;
use std::path::Path;

use biogate_audit::AuditQuery;
use biogate_core::{ActionStatus, AuditCategory, Modality, Role};
use biogate_gate::{spawn_expiry_sweeper, ActionRequest, GateError};

use crate::context::AppContext;

fn read_sample(path: &Path) -> Result<Vec<u8>, anyhow::Error> {
    std::fs::read(path).map_err(|e| anyhow::anyhow!("Cannot read sample {}: {}", path.display(), e))
}

/// Parse `key=value` pairs; values that are valid JSON keep their type
pub fn parse_metadata(pairs: &[String]) -> Result<HashMap<String, serde_json::Value>, anyhow::Error> {
    let mut metadata = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("Metadata must be key=value, got '{}'", pair);
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        metadata.insert(key.trim().to_string(), value);
    }
    Ok(metadata)
}

/// Register a principal
pub async fn register(
    ctx: &AppContext,
    username: &str,
    full_name: Option<&str>,
    role: Role,
    consent: bool,
) -> Result<(), anyhow::Error> {
    let principal = ctx.principals.register(username, full_name, role, consent)?;
    println!(
        "✅ Registered {} (id: {}, role: {}, consent: {})",
        principal.username, principal.id, principal.role, principal.consent_given
    );
    println!("   Pseudonym: {}", principal.pseudonym);
    Ok(())
}

/// Grant or revoke biometric consent
pub async fn consent(ctx: &AppContext, username: &str, granted: bool) -> Result<(), anyhow::Error> {
    let principal = ctx.principals.find(username)?;
    ctx.principals.set_consent(principal.id, granted)?;
    if granted {
        println!("✅ Biometric consent granted for {}", username);
    } else {
        println!("✅ Biometric consent revoked for {}", username);
    }
    Ok(())
}

/// Activate or deactivate a principal
pub async fn set_active(ctx: &AppContext, username: &str, active: bool) -> Result<(), anyhow::Error> {
    let principal = ctx.principals.find(username)?;
    ctx.principals.set_active(principal.id, active)?;
    println!("✅ {} is now {}", username, if active { "active" } else { "inactive" });
    Ok(())
}

/// Enroll a biometric sample
pub async fn enroll(
    ctx: &AppContext,
    username: &str,
    modality: Modality,
    sample_path: &Path,
    consent_confirmed: bool,
) -> Result<(), anyhow::Error> {
    let principal = ctx.principals.find(username)?;
    let sample = read_sample(sample_path)?;

    let outcome = ctx
        .verifier
        .enroll(principal.id, modality, &sample, consent_confirmed)
        .await?;

    if !outcome.success {
        anyhow::bail!("{}", outcome.message);
    }
    println!(
        "✅ {} (quality: {:.3})",
        outcome.message,
        outcome.quality_score.unwrap_or_default()
    );
    Ok(())
}

/// Verify a sample without touching any action
pub async fn authenticate(
    ctx: &AppContext,
    username: &str,
    modality: Modality,
    sample_path: &Path,
) -> Result<(), anyhow::Error> {
    let principal = ctx.principals.find(username)?;
    let sample = read_sample(sample_path)?;

    let outcome = ctx.verifier.authenticate(principal.id, modality, &sample).await?;
    let score = outcome
        .similarity_score
        .map(|s| format!("{:.3}", s))
        .unwrap_or_else(|| "-".to_string());

    match (outcome.success, outcome.authenticated) {
        (true, true) => println!("✅ {} (similarity: {})", outcome.message, score),
        (true, false) => println!("❌ {} (similarity: {})", outcome.message, score),
        (false, _) => anyhow::bail!("{}", outcome.message),
    }
    Ok(())
}

/// Request a gated action
pub async fn request(
    ctx: &AppContext,
    username: &str,
    kind: &str,
    description: &str,
    metadata: &[String],
) -> Result<String, anyhow::Error> {
    let principal = ctx.principals.find(username)?;
    let mut request = ActionRequest::new(kind, description);
    request.metadata = parse_metadata(metadata)?;

    let ticket = ctx.gate.request_action(principal.id, request)?;
    println!("✅ Action requested: {}", ticket.action_id);
    println!("   Status: {}  Expires: {}", ticket.status, ticket.expires_at.to_rfc3339());
    Ok(ticket.action_id)
}

/// Approve a pending action with a biometric sample
pub async fn approve(
    ctx: &AppContext,
    action_id: &str,
    username: &str,
    modality: Modality,
    sample_path: &Path,
) -> Result<(), anyhow::Error> {
    let approver = ctx.principals.find(username)?;
    let sample = read_sample(sample_path)?;

    match ctx.gate.approve_action(action_id, approver.id, modality, &sample).await {
        Ok(decision) => {
            let score = decision
                .similarity_score
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| "-".to_string());
            if decision.approved {
                println!("✅ {} ({}, similarity: {})", decision.message, decision.action_id, score);
            } else {
                println!("❌ {} ({}, similarity: {})", decision.message, decision.action_id, score);
            }
            Ok(())
        }
        Err(GateError::AlreadyDecided(status)) => anyhow::bail!("Action {} is already {}", action_id, status),
        Err(GateError::Expired) => anyhow::bail!("Action {} has expired and was denied", action_id),
        Err(e) => Err(e.into()),
    }
}

/// Show the status of an action
pub async fn status(ctx: &AppContext, action_id: &str) -> Result<(), anyhow::Error> {
    let view = ctx.gate.get_status(action_id)?;
    println!("Action {} ({})", view.action_id, view.kind);
    println!("   Status:  {}", view.status);
    println!("   Expires: {}", view.expires_at.to_rfc3339());
    if let (Some(approver), Some(method), Some(at)) = (view.approver, view.approval_method, view.approved_at) {
        println!("   Approved by {} via {} at {}", approver, method, at.to_rfc3339());
    }
    Ok(())
}

/// List recent actions
pub async fn list(ctx: &AppContext, status: Option<ActionStatus>, limit: u32) -> Result<(), anyhow::Error> {
    let actions = ctx.gate.list_actions(status, limit)?;
    if actions.is_empty() {
        println!("No actions found");
        return Ok(());
    }

    println!("Actions ({}):", actions.len());
    println!("{:-<96}", "");
    println!(
        "{:<42} {:<16} {:<9} {:<25}",
        "ACTION", "KIND", "STATUS", "EXPIRES"
    );
    println!("{:-<96}", "");
    for action in actions {
        println!(
            "{:<42} {:<16} {:<9} {:<25}",
            action.action_id,
            action.kind,
            action.status.to_string(),
            action.expires_at.to_rfc3339()
        );
    }
    Ok(())
}

/// Deny overdue pending actions once
pub async fn sweep(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let count = ctx.gate.sweep_expired()?;
    println!("✅ Denied {} expired action(s)", count);
    Ok(())
}

/// Run the expiry sweeper until Ctrl-C
pub async fn watch(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let period = ctx.config().gate.sweep_interval();
    let handle = spawn_expiry_sweeper(ctx.gate.clone(), period);
    println!("🔄 Sweeping expired actions every {}s (Ctrl-C to stop)", period.as_secs());

    tokio::signal::ctrl_c().await?;
    handle.abort();
    println!("✅ Sweeper stopped");
    Ok(())
}

/// Show action counts per status
pub async fn stats(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let stats = ctx.gate.stats()?;
    println!("Database: {}", ctx.database_path().display());
    println!("Pending:  {}", stats.pending);
    println!("Approved: {}", stats.approved);
    println!("Denied:   {}", stats.denied);
    Ok(())
}

/// Query the audit trail, or export it as JSON lines
pub async fn audit(
    ctx: &AppContext,
    username: Option<&str>,
    category: Option<AuditCategory>,
    action_id: Option<String>,
    skip: u32,
    limit: u32,
    export: Option<&Path>,
) -> Result<(), anyhow::Error> {
    let principal = match username {
        Some(username) => Some(ctx.principals.find(username)?.id),
        None => None,
    };
    let query = AuditQuery {
        principal,
        category,
        action_id,
        skip,
        limit,
    };

    if let Some(path) = export {
        let written = ctx.audit.export_jsonl(path, &query)?;
        println!("✅ Exported {} audit event(s) to {}", written, path.display());
        return Ok(());
    }

    let page = ctx.audit.query(&query)?;
    println!("Audit events ({} of {}):", page.events.len(), page.total);
    println!("{:-<96}", "");
    for event in page.events {
        let score = event
            .similarity_score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} [{}] {} -> {} (score: {})",
            event.timestamp.to_rfc3339(),
            event.category,
            event.summary,
            event.status,
            score
        );
        if let Some(detail) = event.detail {
            println!("   {}", detail);
        }
    }
    Ok(())
}

/// Erase a principal and their biometric data
pub async fn erase(ctx: &AppContext, username: &str) -> Result<(), anyhow::Error> {
    let principal = ctx.principals.find(username)?;
    let report = ctx.principals.erase(principal.id)?;
    println!(
        "✅ Erased {}: {} descriptor(s) removed, {} audit event(s) detached",
        username, report.descriptors_removed, report.audit_events_detached
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let pairs = vec![
            "pipeline_id=ci-42".to_string(),
            "attempt=3".to_string(),
            "dry_run=true".to_string(),
        ];
        let metadata = parse_metadata(&pairs).unwrap();

        assert_eq!(metadata["pipeline_id"], serde_json::json!("ci-42"));
        assert_eq!(metadata["attempt"], serde_json::json!(3));
        assert_eq!(metadata["dry_run"], serde_json::json!(true));
    }

    #[test]
    fn test_parse_metadata_rejects_bare_key() {
        assert!(parse_metadata(&["environment".to_string()]).is_err());
    }
}
