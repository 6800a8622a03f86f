//! [`StubGitLab`]: an in-memory upstream client.
//!
//! Every sub-service answers from canned values configured through the
//! builder methods, and every call is recorded so tests can assert on the
//! project identifier and options a handler sent.
//!
//! ```rust,no_run
//! use gl_test_utils::{StubGitLab, fixtures};
//!
//! let stub = StubGitLab::new()
//!     .with_issue(fixtures::issue(1, "Test Issue", "opened", "Test User"))
//!     .shared();
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gl_upstream::{
    CreateIssueOptions, CreateMergeRequestOptions, CreateNoteOptions, File, GetFileOptions,
    GitLab, Issue, IssuesService, ListProjectIssuesOptions, ListProjectMergeRequestsOptions,
    ListProjectsOptions, MergeRequest, MergeRequestsService, Note, NotesService, Project,
    ProjectsService, RepositoryFilesService, Response, Result, SearchService,
    UpdateIssueOptions, UpdateMergeRequestOptions, UpstreamError, User, UsersService,
};
use serde::Serialize;
use serde_json::Value;

/// One recorded upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Operation name, e.g. `get_issue` or `search_projects`
    pub operation: &'static str,
    /// Project identifier, file path or search query the call was keyed by
    pub target: Option<String>,
    /// Numeric identifier (issue or merge request iid), if any
    pub iid: Option<i64>,
    /// Options the call was made with, as JSON
    pub options: Value,
}

/// In-memory upstream client with canned responses.
#[derive(Default)]
pub struct StubGitLab {
    issue: Option<Issue>,
    issues: Vec<Issue>,
    merge_request: Option<MergeRequest>,
    merge_requests: Vec<MergeRequest>,
    projects: Vec<Project>,
    search_projects: Vec<Project>,
    search_merge_requests: Vec<MergeRequest>,
    search_users: Vec<User>,
    current_user: Option<User>,
    file: Option<File>,
    notes: Vec<Note>,
    note: Option<Note>,
    statuses: HashMap<&'static str, (u16, String)>,
    failures: HashMap<&'static str, String>,
    calls: Mutex<Vec<Call>>,
}

impl StubGitLab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returned by `get_issue`, `create_issue` and `update_issue`.
    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issue = Some(issue);
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    /// Returned by `get_merge_request`, `create_merge_request` and
    /// `update_merge_request`.
    pub fn with_merge_request(mut self, mr: MergeRequest) -> Self {
        self.merge_request = Some(mr);
        self
    }

    pub fn with_merge_requests(mut self, mrs: Vec<MergeRequest>) -> Self {
        self.merge_requests = mrs;
        self
    }

    /// Returned by `list_projects`.
    pub fn with_projects(mut self, projects: Vec<Project>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_search_projects(mut self, projects: Vec<Project>) -> Self {
        self.search_projects = projects;
        self
    }

    pub fn with_search_merge_requests(mut self, mrs: Vec<MergeRequest>) -> Self {
        self.search_merge_requests = mrs;
        self
    }

    pub fn with_search_users(mut self, users: Vec<User>) -> Self {
        self.search_users = users;
        self
    }

    pub fn with_current_user(mut self, user: User) -> Self {
        self.current_user = Some(user);
        self
    }

    pub fn with_file(mut self, file: File) -> Self {
        self.file = Some(file);
        self
    }

    /// Returned by both note listing operations.
    pub fn with_notes(mut self, notes: Vec<Note>) -> Self {
        self.notes = notes;
        self
    }

    /// Returned by both note creation operations.
    pub fn with_note(mut self, note: Note) -> Self {
        self.note = Some(note);
        self
    }

    /// Answer `operation` with a specific status code and raw body.
    pub fn with_status(
        mut self,
        operation: &'static str,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        self.statuses.insert(operation, (status, body.into()));
        self
    }

    /// Make `operation` fail with [`UpstreamError::Other`].
    pub fn failing(mut self, operation: &'static str, message: impl Into<String>) -> Self {
        self.failures.insert(operation, message.into());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The most recent call to `operation`, if any.
    pub fn last_call(&self, operation: &str) -> Option<Call> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| c.operation == operation)
    }

    fn record(
        &self,
        operation: &'static str,
        target: Option<&str>,
        iid: Option<i64>,
        options: impl Serialize,
    ) {
        let call = Call {
            operation,
            target: target.map(str::to_string),
            iid,
            options: serde_json::to_value(options).unwrap_or(Value::Null),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn respond<T: Clone>(&self, operation: &'static str, value: Option<&T>) -> Result<Response<T>> {
        if let Some(message) = self.failures.get(operation) {
            return Err(UpstreamError::Other(message.clone()));
        }
        let value = value
            .cloned()
            .ok_or_else(|| UpstreamError::Other(format!("no stub response for {operation}")))?;
        let (status, body) = self
            .statuses
            .get(operation)
            .cloned()
            .unwrap_or_else(|| (default_status(operation), String::new()));
        Ok(Response::with_status(value, status).with_body(body))
    }
}

fn default_status(operation: &str) -> u16 {
    if operation.starts_with("create_") {
        201
    } else {
        200
    }
}

/// Client accessor body that fails the test if a handler reaches the
/// network phase.
pub fn panicking_client() -> Result<Arc<dyn GitLab>> {
    panic!("client accessor invoked; argument validation should have failed first")
}

impl GitLab for StubGitLab {
    fn issues(&self) -> &dyn IssuesService {
        self
    }
    fn merge_requests(&self) -> &dyn MergeRequestsService {
        self
    }
    fn projects(&self) -> &dyn ProjectsService {
        self
    }
    fn repository_files(&self) -> &dyn RepositoryFilesService {
        self
    }
    fn notes(&self) -> &dyn NotesService {
        self
    }
    fn users(&self) -> &dyn UsersService {
        self
    }
    fn search(&self) -> &dyn SearchService {
        self
    }
}

#[async_trait]
impl IssuesService for StubGitLab {
    async fn get_issue(&self, project: &str, iid: i64) -> Result<Response<Issue>> {
        self.record("get_issue", Some(project), Some(iid), ());
        self.respond("get_issue", self.issue.as_ref())
    }

    async fn list_project_issues(
        &self,
        project: &str,
        opts: &ListProjectIssuesOptions,
    ) -> Result<Response<Vec<Issue>>> {
        self.record("list_project_issues", Some(project), None, opts);
        self.respond("list_project_issues", Some(&self.issues))
    }

    async fn create_issue(
        &self,
        project: &str,
        opts: &CreateIssueOptions,
    ) -> Result<Response<Issue>> {
        self.record("create_issue", Some(project), None, opts);
        self.respond("create_issue", self.issue.as_ref())
    }

    async fn update_issue(
        &self,
        project: &str,
        iid: i64,
        opts: &UpdateIssueOptions,
    ) -> Result<Response<Issue>> {
        self.record("update_issue", Some(project), Some(iid), opts);
        self.respond("update_issue", self.issue.as_ref())
    }
}

#[async_trait]
impl MergeRequestsService for StubGitLab {
    async fn get_merge_request(&self, project: &str, iid: i64) -> Result<Response<MergeRequest>> {
        self.record("get_merge_request", Some(project), Some(iid), ());
        self.respond("get_merge_request", self.merge_request.as_ref())
    }

    async fn list_project_merge_requests(
        &self,
        project: &str,
        opts: &ListProjectMergeRequestsOptions,
    ) -> Result<Response<Vec<MergeRequest>>> {
        self.record("list_project_merge_requests", Some(project), None, opts);
        self.respond("list_project_merge_requests", Some(&self.merge_requests))
    }

    async fn create_merge_request(
        &self,
        project: &str,
        opts: &CreateMergeRequestOptions,
    ) -> Result<Response<MergeRequest>> {
        self.record("create_merge_request", Some(project), None, opts);
        self.respond("create_merge_request", self.merge_request.as_ref())
    }

    async fn update_merge_request(
        &self,
        project: &str,
        iid: i64,
        opts: &UpdateMergeRequestOptions,
    ) -> Result<Response<MergeRequest>> {
        self.record("update_merge_request", Some(project), Some(iid), opts);
        self.respond("update_merge_request", self.merge_request.as_ref())
    }
}

#[async_trait]
impl ProjectsService for StubGitLab {
    async fn list_projects(&self, opts: &ListProjectsOptions) -> Result<Response<Vec<Project>>> {
        self.record("list_projects", None, None, opts);
        self.respond("list_projects", Some(&self.projects))
    }
}

#[async_trait]
impl RepositoryFilesService for StubGitLab {
    async fn get_file(
        &self,
        project: &str,
        path: &str,
        opts: &GetFileOptions,
    ) -> Result<Response<File>> {
        self.record(
            "get_file",
            Some(&format!("{project}:{path}")),
            None,
            opts,
        );
        self.respond("get_file", self.file.as_ref())
    }
}

#[async_trait]
impl NotesService for StubGitLab {
    async fn list_issue_notes(&self, project: &str, iid: i64) -> Result<Response<Vec<Note>>> {
        self.record("list_issue_notes", Some(project), Some(iid), ());
        self.respond("list_issue_notes", Some(&self.notes))
    }

    async fn create_issue_note(
        &self,
        project: &str,
        iid: i64,
        opts: &CreateNoteOptions,
    ) -> Result<Response<Note>> {
        self.record("create_issue_note", Some(project), Some(iid), opts);
        self.respond("create_issue_note", self.note.as_ref())
    }

    async fn list_merge_request_notes(
        &self,
        project: &str,
        iid: i64,
    ) -> Result<Response<Vec<Note>>> {
        self.record("list_merge_request_notes", Some(project), Some(iid), ());
        self.respond("list_merge_request_notes", Some(&self.notes))
    }

    async fn create_merge_request_note(
        &self,
        project: &str,
        iid: i64,
        opts: &CreateNoteOptions,
    ) -> Result<Response<Note>> {
        self.record("create_merge_request_note", Some(project), Some(iid), opts);
        self.respond("create_merge_request_note", self.note.as_ref())
    }
}

#[async_trait]
impl UsersService for StubGitLab {
    async fn current_user(&self) -> Result<Response<User>> {
        self.record("current_user", None, None, ());
        self.respond("current_user", self.current_user.as_ref())
    }
}

#[async_trait]
impl SearchService for StubGitLab {
    async fn projects(&self, query: &str) -> Result<Response<Vec<Project>>> {
        self.record("search_projects", Some(query), None, ());
        self.respond("search_projects", Some(&self.search_projects))
    }

    async fn merge_requests(&self, query: &str) -> Result<Response<Vec<MergeRequest>>> {
        self.record("search_merge_requests", Some(query), None, ());
        self.respond("search_merge_requests", Some(&self.search_merge_requests))
    }

    async fn users(&self, query: &str) -> Result<Response<Vec<User>>> {
        self.record("search_users", Some(query), None, ());
        self.respond("search_users", Some(&self.search_users))
    }
}
