use serde::{Deserialize, Serialize};
use std::fmt;

pub mod endpoints;

pub use endpoints::Endpoint;

/// Section identity as issued by the server; older payloads use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::Number(id) => write!(f, "{id}"),
            SectionId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for SectionId {
    fn from(id: i64) -> Self {
        SectionId::Number(id)
    }
}

impl From<&str> for SectionId {
    fn from(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(number) => SectionId::Number(number),
            Err(_) => SectionId::Text(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub order_idx: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sections {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvaluationStatus {
    Good,
    Created,
    Improvement,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: EvaluationStatus,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub contents: Option<Vec<String>>,
}

impl Evaluation {
    /// Missing rating or contents means the evaluation has not produced a
    /// result yet.
    pub fn has_result(&self) -> bool {
        self.rating.is_some() && self.contents.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationItem {
    pub installation_id: String,
    pub avatar_url: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installations {
    pub installations: Vec<InstallationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryItem {
    pub avatar_url: String,
    pub name: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repositories {
    pub repositories: Vec<RepositoryItem>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branches {
    pub branches: Vec<String>,
}

/// How the source README is cut into sections on initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Divide at heading boundaries.
    #[default]
    Split,
    /// Keep the whole README as one section.
    Whole,
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Split => "split",
            SplitMode::Whole => "whole",
        }
    }
}

impl std::str::FromStr for SplitMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(SplitMode::Split),
            "whole" => Ok(SplitMode::Whole),
            other => Err(format!(
                "unknown split mode '{other}' (expected 'split' or 'whole')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSectionRequest {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSectionRequest {
    pub branch: String,
    pub split_mode: SplitMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderSectionRequest {
    pub section_ids: Vec<SectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionContentRequest {
    pub section_id: SectionId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSectionRequest {
    pub section_id: SectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluateDraftRequest {
    pub branch: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePullRequestRequest {
    pub branch: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    #[serde(default, alias = "prUrl", alias = "htmlUrl")]
    pub url: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
}

/// Payload of the `connected` SSE event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_ids_accept_numbers_and_strings() {
        let sections: Sections = serde_json::from_str(
            r###"{"sections":[
                {"id":28,"title":"Intro","content":"# Intro","orderIdx":1},
                {"id":"30","title":"Usage","content":"## Usage","orderIdx":2}
            ]}"###,
        )
        .expect("sections should parse");
        assert_eq!(sections.sections[0].id, SectionId::Number(28));
        assert_eq!(sections.sections[1].id, SectionId::Text("30".to_string()));
        assert_eq!(sections.sections[1].id.to_string(), "30");
    }

    #[test]
    fn evaluation_without_rating_has_no_result() {
        let pending: Evaluation =
            serde_json::from_str(r#"{"status":"NONE","rating":null,"contents":null}"#)
                .expect("evaluation should parse");
        assert!(!pending.has_result());

        let done: Evaluation = serde_json::from_str(
            r#"{"status":"IMPROVEMENT","rating":3.5,"contents":["Add a usage section"]}"#,
        )
        .expect("evaluation should parse");
        assert_eq!(done.status, EvaluationStatus::Improvement);
        assert!(done.has_result());
    }

    #[test]
    fn split_mode_parses_case_insensitively() {
        assert_eq!("Whole".parse::<SplitMode>(), Ok(SplitMode::Whole));
        assert_eq!(" split ".parse::<SplitMode>(), Ok(SplitMode::Split));
        assert!("chapters".parse::<SplitMode>().is_err());
    }

    #[test]
    fn reorder_request_uses_camel_case() {
        let request = ReorderSectionRequest {
            section_ids: vec![SectionId::Number(3), SectionId::Number(1)],
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value, serde_json::json!({"sectionIds": [3, 1]}));
    }
}
