//! Sub-service traits of the upstream client
//!
//! Implementations must be safe for concurrent use: the MCP server may call
//! any of these from several tasks at once.

use async_trait::async_trait;

use crate::models::{File, Issue, MergeRequest, Note, Project, User};
use crate::options::{
    CreateIssueOptions, CreateMergeRequestOptions, CreateNoteOptions, GetFileOptions,
    ListProjectIssuesOptions, ListProjectMergeRequestsOptions, ListProjectsOptions,
    UpdateIssueOptions, UpdateMergeRequestOptions,
};
use crate::{Response, Result};

#[async_trait]
pub trait IssuesService: Send + Sync {
    async fn get_issue(&self, project: &str, iid: i64) -> Result<Response<Issue>>;

    async fn list_project_issues(
        &self,
        project: &str,
        opts: &ListProjectIssuesOptions,
    ) -> Result<Response<Vec<Issue>>>;

    async fn create_issue(&self, project: &str, opts: &CreateIssueOptions)
    -> Result<Response<Issue>>;

    async fn update_issue(
        &self,
        project: &str,
        iid: i64,
        opts: &UpdateIssueOptions,
    ) -> Result<Response<Issue>>;
}

#[async_trait]
pub trait MergeRequestsService: Send + Sync {
    async fn get_merge_request(&self, project: &str, iid: i64) -> Result<Response<MergeRequest>>;

    async fn list_project_merge_requests(
        &self,
        project: &str,
        opts: &ListProjectMergeRequestsOptions,
    ) -> Result<Response<Vec<MergeRequest>>>;

    async fn create_merge_request(
        &self,
        project: &str,
        opts: &CreateMergeRequestOptions,
    ) -> Result<Response<MergeRequest>>;

    async fn update_merge_request(
        &self,
        project: &str,
        iid: i64,
        opts: &UpdateMergeRequestOptions,
    ) -> Result<Response<MergeRequest>>;
}

#[async_trait]
pub trait ProjectsService: Send + Sync {
    async fn list_projects(&self, opts: &ListProjectsOptions) -> Result<Response<Vec<Project>>>;
}

#[async_trait]
pub trait RepositoryFilesService: Send + Sync {
    async fn get_file(
        &self,
        project: &str,
        path: &str,
        opts: &GetFileOptions,
    ) -> Result<Response<File>>;
}

#[async_trait]
pub trait NotesService: Send + Sync {
    async fn list_issue_notes(&self, project: &str, iid: i64) -> Result<Response<Vec<Note>>>;

    async fn create_issue_note(
        &self,
        project: &str,
        iid: i64,
        opts: &CreateNoteOptions,
    ) -> Result<Response<Note>>;

    async fn list_merge_request_notes(
        &self,
        project: &str,
        iid: i64,
    ) -> Result<Response<Vec<Note>>>;

    async fn create_merge_request_note(
        &self,
        project: &str,
        iid: i64,
        opts: &CreateNoteOptions,
    ) -> Result<Response<Note>>;
}

#[async_trait]
pub trait UsersService: Send + Sync {
    /// The user the client is authenticated as.
    async fn current_user(&self) -> Result<Response<User>>;
}

/// Instance-wide search
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn projects(&self, query: &str) -> Result<Response<Vec<Project>>>;

    async fn merge_requests(&self, query: &str) -> Result<Response<Vec<MergeRequest>>>;

    async fn users(&self, query: &str) -> Result<Response<Vec<User>>>;
}

/// A ready-to-use upstream client exposing every sub-service.
pub trait GitLab: Send + Sync {
    fn issues(&self) -> &dyn IssuesService;
    fn merge_requests(&self) -> &dyn MergeRequestsService;
    fn projects(&self) -> &dyn ProjectsService;
    fn repository_files(&self) -> &dyn RepositoryFilesService;
    fn notes(&self) -> &dyn NotesService;
    fn users(&self) -> &dyn UsersService;
    fn search(&self) -> &dyn SearchService;
}
