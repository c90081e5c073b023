//! `warden decide` - run one request through the decision pipeline.

use std::path::Path;

use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;
use tracing::info;

use warden_config::loader::load_file;
use warden_core::InvocationDraft;
use warden_gateway::DecisionGateway;

pub(crate) async fn run(config_path: &Path, request: &str) -> anyhow::Result<()> {
    let config = load_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let gateway = DecisionGateway::from_config(&config)?;
    let draft = parse_draft(request)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling decision");
            on_interrupt.cancel();
        }
    });

    let (_, verdict) = gateway.decide_invocation(draft, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

/// Parse an inline JSON request, or read it from the file named by `@path`.
fn parse_draft(request: &str) -> anyhow::Result<InvocationDraft> {
    let body = match request.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {path}"))?,
        None => request.to_string(),
    };
    if body.trim().is_empty() {
        bail!("request is empty");
    }
    serde_json::from_str(&body).context("request is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_inline_draft() {
        let draft = parse_draft(
            r#"{"resource_id":"shop","operation_id":"listOrders","verb":"GET","path":"/orders"}"#,
        )
        .unwrap();
        assert_eq!(draft.resource_id.as_deref(), Some("shop"));
    }

    #[test]
    fn test_parse_draft_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"resource_id":"shop","verb":"POST"}}"#).unwrap();
        let draft = parse_draft(&format!("@{}", file.path().display())).unwrap();
        assert_eq!(draft.verb.as_deref(), Some("POST"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_draft("").is_err());
        assert!(parse_draft("{not json").is_err());
    }

    #[tokio::test]
    async fn test_decide_against_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[resources]]
id = "shop"

[resources.policy]
base_url = "https://api.shop.example"
allowed_verbs = ["GET"]
"#
        )
        .unwrap();

        let request =
            r#"{"resource_id":"shop","operation_id":"listOrders","verb":"GET","path":"/orders","classification":"READ"}"#;
        assert!(run(file.path(), request).await.is_ok());

        let unknown = r#"{"resource_id":"crm","operation_id":"x","verb":"GET","path":"/x"}"#;
        assert!(run(file.path(), unknown).await.is_err());
    }
}
