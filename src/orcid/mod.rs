use anyhow::Context;
use serde::Deserialize;

use crate::config::Settings;

pub mod fetch;

/// Media type the ORCID public API answers with JSON for.
pub const ORCID_JSON: &str = "application/orcid+json";

/// Something that can answer a GET against the ORCID API with a raw JSON body.
///
/// Paths are relative to the API root, with or without a leading slash (work summaries carry
/// one, e.g. `/0000-0002-1825-0097/work/1234`).
pub trait OrcidApi: Sync {
    fn get(&self, path: &str) -> anyhow::Result<String>;
}

/// The real API over a single ureq agent, so every request shares one connection pool.
pub struct HttpApi {
    agent: ureq::Agent,
    base: String,
}

impl HttpApi {
    pub fn new(settings: &Settings) -> Self {
        if !settings.verify_tls && settings.api_url.starts_with("https://") {
            tracing::warn!(base = %settings.api_url, "TLS certificate verification is disabled");
        }
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!settings.verify_tls)
            .build();
        let cfg = ureq::Agent::config_builder()
            .tls_config(tls)
            .max_idle_connections_per_host(settings.concurrency)
            .build();
        HttpApi {
            agent: ureq::Agent::new_with_config(cfg),
            base: settings.api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

impl OrcidApi for HttpApi {
    fn get(&self, path: &str) -> anyhow::Result<String> {
        let url = self.url_for(path);
        tracing::debug!(%url, "GET");
        let body = self
            .agent
            .get(url.as_str())
            .header("Accept", ORCID_JSON)
            .call()
            .with_context(|| format!("failed ORCID request for {url}"))?
            .into_body()
            .read_to_string()
            .with_context(|| format!("failed to read ORCID response from {url}"))?;
        Ok(body)
    }
}

/// `GET /<orcid>/works`: one group per distinct work, each holding the versions (summaries) that
/// different sources reported for it.
#[derive(Debug, Deserialize)]
pub struct Works {
    pub group: Vec<WorkGroup>,
}

#[derive(Debug, Deserialize)]
pub struct WorkGroup {
    #[serde(rename = "work-summary")]
    pub work_summary: Vec<WorkSummary>,
}

#[derive(Debug, Deserialize)]
pub struct WorkSummary {
    pub path: String,
}

/// `GET /<orcid>/work/<put-code>`, reduced to the part we use.
#[derive(Debug, Deserialize)]
pub struct Work {
    #[serde(default)]
    pub citation: Option<Citation>,
}

#[derive(Debug, Deserialize)]
pub struct Citation {
    #[serde(rename = "citation-type")]
    pub citation_type: Option<String>,
    #[serde(rename = "citation-value")]
    pub citation_value: Option<String>,
}

impl Work {
    /// The citation text if this work carries a BibTeX citation.
    pub fn bibtex(&self) -> Option<&str> {
        let citation = self.citation.as_ref()?;
        let kind = citation.citation_type.as_deref()?;
        if kind.eq_ignore_ascii_case("bibtex") {
            citation.citation_value.as_deref()
        } else {
            None
        }
    }
}

/// One detail path per work group: the first summary's.
pub fn work_paths(works: &Works) -> anyhow::Result<Vec<String>> {
    works
        .group
        .iter()
        .enumerate()
        .map(|(i, group)| {
            group
                .work_summary
                .first()
                .map(|s| s.path.clone())
                .ok_or_else(|| anyhow::anyhow!("work group {i} has no work summaries"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_paths_takes_first_summary_of_each_group() {
        let works: Works = serde_json::from_str(
            r#"{"group": [
                {"work-summary": [{"path": "/0000-0002-1543-0148/work/1"}, {"path": "/0000-0002-1543-0148/work/9"}]},
                {"work-summary": [{"path": "/0000-0002-1543-0148/work/2"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            work_paths(&works).unwrap(),
            vec!["/0000-0002-1543-0148/work/1", "/0000-0002-1543-0148/work/2"]
        );
    }

    #[test]
    fn empty_group_is_an_error() {
        let works: Works = serde_json::from_str(
            r#"{"group": [{"work-summary": [{"path": "/a/work/1"}]}, {"work-summary": []}]}"#,
        )
        .unwrap();
        let err = work_paths(&works).unwrap_err();
        assert!(err.to_string().contains("work group 1"), "{err}");
    }

    #[test]
    fn missing_group_list_is_a_decode_error() {
        assert!(serde_json::from_str::<Works>(r#"{"last-modified-date": null}"#).is_err());
    }

    #[test]
    fn bibtex_only_for_bibtex_citations() {
        let bib: Work = serde_json::from_str(
            r#"{"citation": {"citation-type": "bibtex", "citation-value": "@article{a, title={T}}"}}"#,
        )
        .unwrap();
        assert_eq!(bib.bibtex(), Some("@article{a, title={T}}"));

        let upper: Work = serde_json::from_str(
            r#"{"citation": {"citation-type": "BIBTEX", "citation-value": "@misc{b}"}}"#,
        )
        .unwrap();
        assert_eq!(upper.bibtex(), Some("@misc{b}"));

        let other: Work = serde_json::from_str(
            r#"{"citation": {"citation-type": "formatted-unspecified", "citation-value": "Someone (2020)."}}"#,
        )
        .unwrap();
        assert_eq!(other.bibtex(), None);

        let none: Work = serde_json::from_str(r#"{"citation": null, "title": {}}"#).unwrap();
        assert_eq!(none.bibtex(), None);
    }

    #[test]
    fn url_joins_paths_with_single_slash() {
        let settings = Settings {
            api_url: "https://pub.orcid.org/".to_string(),
            ..Settings::default()
        };
        let api = HttpApi::new(&settings);
        assert_eq!(
            api.url_for("/0000-0002-1543-0148/work/7"),
            "https://pub.orcid.org/0000-0002-1543-0148/work/7"
        );
        assert_eq!(
            api.url_for("0000-0002-1543-0148/works"),
            "https://pub.orcid.org/0000-0002-1543-0148/works"
        );
    }
}
