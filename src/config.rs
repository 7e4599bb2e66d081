//! Runtime settings. The command line only carries the ORCID id and the output path, everything
//! else has a default that can be overridden from the environment.

use anyhow::{Context, anyhow};

/// Public ORCID API host.
pub const ORCID_API_URL: &str = "https://pub.orcid.org";

/// Upper bound on simultaneous work-detail requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 50;

/// Spaces in front of every field line of a written entry.
pub const INDENT: usize = 4;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub concurrency: usize,
    pub verify_tls: bool,
    pub indent: usize,
    /// Fields entries are ordered by, compared left to right.
    pub order_by: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_url: ORCID_API_URL.to_string(),
            concurrency: MAX_CONCURRENT_REQUESTS,
            verify_tls: false,
            indent: INDENT,
            order_by: vec!["year".to_string()],
        }
    }
}

impl Settings {
    /// Defaults, overridden by `ORCID_API_URL`, `ORCID_CONCURRENCY` and `ORCID_TLS_VERIFY`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut settings = Settings::default();

        if let Some(url) = lookup("ORCID_API_URL") {
            url::Url::parse(&url).with_context(|| format!("ORCID_API_URL is not a URL: {url}"))?;
            settings.api_url = url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup("ORCID_CONCURRENCY") {
            let n: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("ORCID_CONCURRENCY is not a number: {raw}"))?;
            if n == 0 {
                return Err(anyhow!("ORCID_CONCURRENCY must be at least 1"));
            }
            settings.concurrency = n;
        }

        if let Some(raw) = lookup("ORCID_TLS_VERIFY") {
            settings.verify_tls = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => return Err(anyhow!("ORCID_TLS_VERIFY must be a boolean, got {other}")),
            };
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(vars: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_public_api() {
        let s = settings_with(&[]).unwrap();
        assert_eq!(s.api_url, "https://pub.orcid.org");
        assert_eq!(s.concurrency, 50);
        assert!(!s.verify_tls);
        assert_eq!(s.indent, 4);
        assert_eq!(s.order_by, vec!["year".to_string()]);
    }

    #[test]
    fn api_url_override_drops_trailing_slash() {
        let s = settings_with(&[("ORCID_API_URL", "http://127.0.0.1:8080/")]).unwrap();
        assert_eq!(s.api_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(settings_with(&[("ORCID_API_URL", "not a url")]).is_err());
        assert!(settings_with(&[("ORCID_CONCURRENCY", "many")]).is_err());
        assert!(settings_with(&[("ORCID_CONCURRENCY", "0")]).is_err());
        let err = settings_with(&[("ORCID_TLS_VERIFY", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("ORCID_TLS_VERIFY"));
    }

    #[test]
    fn tls_and_concurrency_overrides() {
        let s =
            settings_with(&[("ORCID_TLS_VERIFY", "true"), ("ORCID_CONCURRENCY", " 8 ")]).unwrap();
        assert!(s.verify_tls);
        assert_eq!(s.concurrency, 8);
    }
}
