//! `warden check-config` - load and validate a configuration file.

use std::path::Path;

use anyhow::Context;

use warden_config::loader::load_file;

pub(crate) fn run(path: &Path) -> anyhow::Result<()> {
    let config = load_file(path)
        .with_context(|| format!("configuration {} is invalid", path.display()))?;

    println!("{}: ok", path.display());
    for resource in &config.resources {
        let review = if resource.review.enabled {
            format!("review {} ({}ms)", resource.review.mode, resource.review.timeout_ms)
        } else {
            "review off".to_string()
        };
        println!(
            "  {:<20} {:<40} {}{}",
            resource.id,
            resource.policy.base_url,
            review,
            if resource.policy.dry_run { ", dry run" } else { "" }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_valid_file_passes() {
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
        assert!(run(file.path()).is_ok());
    }

    #[test]
    fn test_invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[approvals]\nexpiry_hours = 0").unwrap();
        let err = run(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }
}
