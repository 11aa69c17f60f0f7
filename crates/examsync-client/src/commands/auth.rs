//! Credential commands.
//!
//! The first credential comes from the authorization flow run outside this
//! tool; these commands only inspect and refresh what it stored.

use std::path::Path;

use chrono::{DateTime, Utc};
use examsync_providers::{CredentialStore, StoredCredential, TokenPolicy};
use tracing::info;

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Print what the credential file holds. Makes no network call.
pub fn status(config: &ClientConfig) -> ClientResult<()> {
    let backend = Backend::from_config(config)?;
    let store = CredentialStore::new(backend.token_path());
    let credential = store.load();
    println!("backend:       {}", backend.kind());
    print!(
        "{}",
        describe(store.path(), credential.as_ref(), backend.token_policy(), Utc::now())
    );
    Ok(())
}

/// Force a refresh and persist the new credential.
pub async fn refresh(config: &ClientConfig) -> ClientResult<()> {
    let backend = Backend::from_config(config)?;
    let manager = backend.credential_manager()?;
    let credential = manager.refresh().await?;

    info!(
        backend = %backend.kind(),
        path = %manager.store().path().display(),
        "credential refreshed"
    );
    match credential.expires_at {
        Some(at) => println!("Token refreshed, valid until {}.", at.to_rfc3339()),
        None => println!("Token refreshed."),
    }
    Ok(())
}

fn describe(
    path: &Path,
    credential: Option<&StoredCredential>,
    policy: TokenPolicy,
    now: DateTime<Utc>,
) -> String {
    let mut out = format!("credential:    {}\n", path.display());
    let Some(credential) = credential else {
        out.push_str("status:        missing, run the authorization flow first\n");
        return out;
    };

    let present = |value: &Option<String>| {
        if value.as_deref().is_some_and(|v| !v.is_empty()) {
            "present"
        } else {
            "missing"
        }
    };
    out.push_str(&format!("access token:  {}\n", present(&credential.access_token)));
    out.push_str(&format!("refresh token: {}\n", present(&credential.refresh_token)));

    let expiry = match credential.expires_at {
        None => "unknown".to_string(),
        Some(at) if at <= now => {
            format!("{} (expired {} ago)", at.to_rfc3339(), human_minutes(now - at))
        }
        Some(at) => format!("{} (in {})", at.to_rfc3339(), human_minutes(at - now)),
    };
    out.push_str(&format!("expires:       {}\n", expiry));
    out.push_str(&format!("policy:        {}\n", policy));
    out
}

fn human_minutes(delta: chrono::TimeDelta) -> String {
    let minutes = delta.num_minutes();
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h{:02}m", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 27, 12, 0, 0).unwrap()
    }

    #[test]
    fn describe_missing_credential() {
        let out = describe(Path::new("/tmp/token.json"), None, TokenPolicy::TrustCache, now());
        insta::assert_snapshot!(out.trim_end(), @r"
        credential:    /tmp/token.json
        status:        missing, run the authorization flow first
        ");
    }

    #[test]
    fn describe_expired_credential() {
        let credential = StoredCredential {
            access_token: Some("at".into()),
            refresh_token: Some("rt".into()),
            expires_at: Some(Utc.with_ymd_and_hms(2025, 3, 27, 10, 30, 0).unwrap()),
            ..Default::default()
        };
        let out = describe(
            Path::new("/tmp/token.json"),
            Some(&credential),
            TokenPolicy::CheckExpiry,
            now(),
        );
        insta::assert_snapshot!(out.trim_end(), @r"
        credential:    /tmp/token.json
        access token:  present
        refresh token: present
        expires:       2025-03-27T10:30:00+00:00 (expired 1h30m ago)
        policy:        check-expiry
        ");
    }

    #[test]
    fn describe_valid_credential_without_refresh_token() {
        let credential = StoredCredential {
            access_token: Some("at".into()),
            refresh_token: None,
            expires_at: Some(Utc.with_ymd_and_hms(2025, 3, 27, 12, 45, 0).unwrap()),
            ..Default::default()
        };
        let out = describe(
            Path::new("/tmp/token.json"),
            Some(&credential),
            TokenPolicy::TrustCache,
            now(),
        );
        assert!(out.contains("refresh token: missing"));
        assert!(out.contains("(in 45m)"));
    }

    #[test]
    fn status_requires_the_selected_section() {
        let err = status(&ClientConfig::default()).unwrap_err();
        assert!(matches!(err, ClientError::Config(ref msg) if msg.contains("[outlook]")));

        let google: ClientConfig = toml::from_str("calendar = \"google\"\n").unwrap();
        let err = status(&google).unwrap_err();
        assert!(matches!(err, ClientError::Config(ref msg) if msg.contains("[google]")));
    }

    #[test]
    fn status_reads_the_google_credential_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google-token.json");
        std::fs::write(&path, r#"{"access_token":"ya29","refresh_token":"1//rt"}"#).unwrap();
        let config: ClientConfig = toml::from_str(&format!(
            "calendar = \"google\"\n[google]\nclient_id = \"id\"\nclient_secret = \"s\"\ntoken_path = {:?}\n",
            path.display().to_string()
        ))
        .unwrap();
        assert!(status(&config).is_ok());
    }
}
