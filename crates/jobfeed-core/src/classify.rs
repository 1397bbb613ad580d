//! Keyword tables and the pure predicates built on them.
//!
//! The tables live in `rules/keywords.yaml` and are compiled into the binary;
//! a deployment can point at a replacement file without rebuilding.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

const EMBEDDED_RULES: &str = include_str!("../../../rules/keywords.yaml");

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("reading keyword rules {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing keyword rules: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid url pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRules {
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub remote: Vec<String>,
    #[serde(default)]
    pub kenya: Vec<String>,
    #[serde(default)]
    pub closed_url_markers: Vec<String>,
    #[serde(default)]
    pub direct_url_patterns: Vec<String>,
    #[serde(default)]
    pub generic_url_patterns: Vec<String>,
}

impl KeywordRules {
    pub fn embedded() -> Result<Self, ClassifierError> {
        Self::from_yaml_str(EMBEDDED_RULES)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ClassifierError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

/// Immutable, compiled view of `KeywordRules`. Built once per process.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    job_titles: Vec<String>,
    remote: Vec<String>,
    kenya: Vec<String>,
    closed_url_markers: Vec<String>,
    direct_url_patterns: Vec<Regex>,
    generic_url_patterns: Vec<Regex>,
}

fn lowered(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, ClassifierError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ClassifierError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

impl TextClassifier {
    pub fn new(rules: &KeywordRules) -> Result<Self, ClassifierError> {
        Ok(Self {
            job_titles: lowered(&rules.job_titles),
            remote: lowered(&rules.remote),
            kenya: lowered(&rules.kenya),
            closed_url_markers: lowered(&rules.closed_url_markers),
            direct_url_patterns: compile(&rules.direct_url_patterns)?,
            generic_url_patterns: compile(&rules.generic_url_patterns)?,
        })
    }

    pub fn embedded() -> Result<Self, ClassifierError> {
        Self::new(&KeywordRules::embedded()?)
    }

    /// Title contains at least one role keyword.
    pub fn is_valid_job_title(&self, title: &str) -> bool {
        if title.is_empty() {
            return false;
        }
        contains_any(&title.to_lowercase(), &self.job_titles)
    }

    /// Remote-anywhere roles, or roles physically in Kenya.
    pub fn is_acceptable_location(&self, location: &str, title: &str, url: &str) -> bool {
        let text = format!("{location} {title} {url}").to_lowercase();
        contains_any(&text, &self.remote) || contains_any(&text, &self.kenya)
    }

    /// Specific posting rather than a careers/listing page. A generic-page
    /// match rejects even when a specific pattern also matches.
    pub fn is_direct_job_url(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        let url = url.to_lowercase();
        if self.generic_url_patterns.iter().any(|re| re.is_match(&url)) {
            return false;
        }
        self.direct_url_patterns.iter().any(|re| re.is_match(&url))
    }

    pub fn has_closed_marker(&self, url: &str) -> bool {
        contains_any(&url.to_lowercase(), &self.closed_url_markers)
    }

    pub fn closed_url_markers(&self) -> &[String] {
        &self.closed_url_markers
    }
}
