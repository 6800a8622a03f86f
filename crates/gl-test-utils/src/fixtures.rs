//! Entity constructors for test scenarios.

use gl_upstream::{BasicUser, File, Issue, MergeRequest, Note, Project, User};

pub fn author(name: &str) -> BasicUser {
    BasicUser {
        id: 1,
        username: name.to_lowercase().replace(' ', "."),
        name: name.to_string(),
        state: "active".to_string(),
        web_url: String::new(),
    }
}

pub fn issue(iid: i64, title: &str, state: &str, author_name: &str) -> Issue {
    Issue {
        id: 1000 + iid,
        iid,
        project_id: 42,
        title: title.to_string(),
        state: state.to_string(),
        author: author(author_name),
        ..Default::default()
    }
}

pub fn merge_request(iid: i64, title: &str, description: &str, state: &str) -> MergeRequest {
    MergeRequest {
        id: 2000 + iid,
        iid,
        project_id: 42,
        title: title.to_string(),
        description: description.to_string(),
        state: state.to_string(),
        source_branch: "feature".to_string(),
        target_branch: "main".to_string(),
        author: author("Test User"),
        ..Default::default()
    }
}

pub fn project(name: &str, path_with_namespace: &str) -> Project {
    Project {
        id: 42,
        name: name.to_string(),
        path: name.to_lowercase(),
        path_with_namespace: path_with_namespace.to_string(),
        web_url: format!("https://gitlab.example.com/{path_with_namespace}"),
        default_branch: "main".to_string(),
        ..Default::default()
    }
}

pub fn user(username: &str, name: &str, email: &str) -> User {
    User {
        id: 7,
        username: username.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        state: "active".to_string(),
        ..Default::default()
    }
}

pub fn note(id: i64, body: &str) -> Note {
    Note {
        id,
        body: body.to_string(),
        author: author("Test User"),
        ..Default::default()
    }
}

/// A file whose `content` is already base64 encoded.
pub fn file(path: &str, ref_name: &str, base64_content: &str) -> File {
    File {
        file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
        file_path: path.to_string(),
        size: base64_content.len() as i64,
        encoding: "base64".to_string(),
        content: base64_content.to_string(),
        ref_name: ref_name.to_string(),
        ..Default::default()
    }
}
