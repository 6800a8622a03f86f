//! Entities returned by the upstream service
//!
//! Field names follow the GitLab v4 REST API so that values serialise back
//! to the JSON shape agents already know. Unknown fields are ignored on
//! decode; missing optional fields default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact user reference embedded in issues, merge requests and notes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicUser {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub state: String,
    pub web_url: String,
}

/// Full user record (current user, user search)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub state: String,
    pub bio: String,
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub id: i64,
    pub iid: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub state: String,
    pub author: BasicUser,
    pub assignees: Vec<BasicUser>,
    pub labels: Vec<String>,
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeRequest {
    pub id: i64,
    pub iid: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    pub author: BasicUser,
    pub labels: Vec<String>,
    pub draft: bool,
    pub merge_status: String,
    pub sha: String,
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// A project (repository) record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub path_with_namespace: String,
    pub description: String,
    pub default_branch: String,
    pub visibility: String,
    pub web_url: String,
    pub star_count: i64,
    pub forks_count: i64,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// A comment on an issue or merge request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub id: i64,
    pub body: String,
    pub author: BasicUser,
    pub system: bool,
    pub noteable_type: String,
    pub noteable_iid: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A repository file as returned by the files API.
///
/// `content` is base64 encoded when `encoding` is `"base64"`, which is the
/// only encoding the service uses for this endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub file_name: String,
    pub file_path: String,
    pub size: i64,
    pub encoding: String,
    pub content: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub blob_id: String,
    pub commit_id: String,
    pub last_commit_id: String,
}
