//! Typed views over Jira REST responses.
//!
//! Vendor payloads are decoded into `Raw*` structs and mapped field by field
//! into the flat shapes returned to tool callers.

use serde::{Deserialize, Serialize};

/// The authenticated Jira user (`/rest/api/3/myself`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Condensed issue returned by `jira_get_issue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub project_key: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssue {
    id: String,
    key: String,
    #[serde(default)]
    fields: RawIssueFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIssueFields {
    summary: Option<String>,
    status: Option<Named>,
    issuetype: Option<Named>,
    priority: Option<Named>,
    assignee: Option<RawUserRef>,
    reporter: Option<RawUserRef>,
    project: Option<RawProjectRef>,
    created: Option<String>,
    updated: Option<String>,
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserRef {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct RawProjectRef {
    key: String,
}

impl From<RawIssue> for IssueSummary {
    fn from(raw: RawIssue) -> Self {
        let f = raw.fields;
        Self {
            id: raw.id,
            key: raw.key,
            summary: f.summary.unwrap_or_default(),
            status: f.status.map(|s| s.name),
            issue_type: f.issuetype.map(|t| t.name),
            priority: f.priority.map(|p| p.name),
            assignee: f.assignee.map(|u| u.display_name),
            reporter: f.reporter.map(|u| u.display_name),
            project_key: f.project.map(|p| p.key),
            created: f.created,
            updated: f.updated,
            labels: f.labels,
        }
    }
}
