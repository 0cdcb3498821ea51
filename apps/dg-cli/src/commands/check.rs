// check.rs — Evaluate one request against a policy file.

use std::path::Path;

use anyhow::Context;
use clap::Args;
use dg_config::open_store;
use dg_policy::{EvaluationTrace, OperationKind, OperationRequest};

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Operation: read, write, delete, create-note-type, modify-note-type.
    #[arg(long)]
    pub op: OperationKind,
    /// Target deck (full `::` path).
    #[arg(long)]
    pub deck: Option<String>,
    /// Tag on the target note; repeat for several.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Note type of the target.
    #[arg(long)]
    pub note_type: Option<String>,
    /// Show every layer consulted, not just the outcome.
    #[arg(long)]
    pub trace: bool,
}

impl CheckArgs {
    pub fn request(&self) -> OperationRequest {
        let mut request = OperationRequest::new(self.op);
        if let Some(deck) = &self.deck {
            request = request.in_deck(deck.clone());
        }
        if !self.tags.is_empty() {
            request = request.with_tags(self.tags.iter().cloned());
        }
        if let Some(note_type) = &self.note_type {
            request = request.of_type(note_type.clone());
        }
        request
    }
}

/// Load `config` and evaluate the request described by `args`.
pub fn evaluate(config: &Path, args: &CheckArgs) -> anyhow::Result<EvaluationTrace> {
    let (store, _) = open_store(config)
        .with_context(|| format!("failed to load policy from {}", config.display()))?;
    Ok(store.authorize_with_trace(&args.request()))
}

pub fn execute(config: &Path, args: &CheckArgs) -> anyhow::Result<()> {
    let request = args.request();
    let trace = evaluate(config, args)?;

    println!("request: {}", request.describe_target());
    if args.trace {
        for step in &trace.steps {
            let marker = if step.terminal { "->" } else { "  " };
            println!("{} {:<16} {}", marker, step.layer.as_str(), step.outcome);
        }
    }

    let decision = &trace.decision;
    if decision.is_allowed() {
        println!("ALLOWED");
        return Ok(());
    }
    println!("DENIED: {}", decision.reason);
    anyhow::bail!(
        "request denied by the {} layer",
        decision
            .layer
            .map(|l| l.as_str())
            .unwrap_or("unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_policy::PolicyLayer;

    fn args(op: OperationKind) -> CheckArgs {
        CheckArgs {
            op,
            deck: None,
            tags: Vec::new(),
            note_type: None,
            trace: false,
        }
    }

    fn write_policy(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("policy.json");
        std::fs::write(
            &path,
            r#"{
                "mode": "denylist",
                "global": {"read": true, "write": true, "delete": false},
                "deck_permissions": {"denylist": ["Personal::*"]},
                "protected_decks": ["Default"],
                "tag_restrictions": {"protected_tags": ["exam"]}
            }"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn request_omits_empty_tags() {
        let mut a = args(OperationKind::Write);
        a.deck = Some("Spanish".to_string());
        let request = a.request();
        assert_eq!(request.deck.as_deref(), Some("Spanish"));
        assert!(request.tags.is_none());

        a.tags = vec!["exam".to_string(), "verb".to_string()];
        assert_eq!(a.request().tags.unwrap().len(), 2);
    }

    #[test]
    fn evaluate_reports_denying_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_policy(&dir);

        let mut a = args(OperationKind::Read);
        a.deck = Some("Personal::Diary".to_string());
        let trace = evaluate(&path, &a).unwrap();
        assert_eq!(trace.decision.layer, Some(PolicyLayer::DeckLists));

        let mut a = args(OperationKind::Write);
        a.deck = Some("Spanish".to_string());
        a.tags = vec!["exam".to_string()];
        let trace = evaluate(&path, &a).unwrap();
        assert_eq!(trace.decision.layer, Some(PolicyLayer::TagRestrictions));

        let mut a = args(OperationKind::Write);
        a.deck = Some("Spanish".to_string());
        assert!(evaluate(&path, &a).unwrap().decision.is_allowed());
    }

    #[test]
    fn execute_fails_on_deny() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_policy(&dir);
        let mut a = args(OperationKind::Delete);
        a.deck = Some("Spanish".to_string());
        let err = execute(&path, &a).unwrap_err();
        assert!(err.to_string().contains("global"));
    }

    #[test]
    fn missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = evaluate(&dir.path().join("nope.json"), &args(OperationKind::Read)).unwrap_err();
        assert!(err.to_string().contains("failed to load policy"));
    }
}
