//! Upstream GitLab client interface
//!
//! This crate describes the hosting-service client that the MCP server talks
//! to. It does not implement HTTP: embedders provide a concrete [`GitLab`]
//! implementation (a REST client, a cached client, a test stub) and the
//! server only ever sees these traits.
//!
//! # Layout
//!
//! ```text
//! [ GitLab ]
//!    +--> issues()           -> IssuesService
//!    +--> merge_requests()   -> MergeRequestsService
//!    +--> projects()         -> ProjectsService
//!    +--> repository_files() -> RepositoryFilesService
//!    +--> notes()            -> NotesService
//!    +--> users()            -> UsersService
//!    +--> search()           -> SearchService
//! ```
//!
//! Every operation keyed by a project takes the project identifier in the
//! `"<namespace>/<project>"` form (see [`project_id`]) and returns a
//! [`Response`] carrying the typed value together with the transport status
//! code and raw body.

pub mod error;
pub mod models;
pub mod options;
pub mod response;
pub mod services;

pub use error::{Result, UpstreamError};
pub use models::{BasicUser, File, Issue, MergeRequest, Note, Project, User};
pub use options::{
    CreateIssueOptions, CreateMergeRequestOptions, CreateNoteOptions, GetFileOptions,
    ListProjectIssuesOptions, ListProjectMergeRequestsOptions, ListProjectsOptions,
    UpdateIssueOptions, UpdateMergeRequestOptions,
};
pub use response::Response;
pub use services::{
    GitLab, IssuesService, MergeRequestsService, NotesService, ProjectsService,
    RepositoryFilesService, SearchService, UsersService,
};

/// Join a namespace and project name into the upstream project identifier.
pub fn project_id(namespace: &str, project: &str) -> String {
    format!("{namespace}/{project}")
}
