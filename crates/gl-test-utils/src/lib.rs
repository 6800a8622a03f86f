//! Shared test utilities for the gitlab-mcp workspace.
//!
//! This crate provides a stub upstream client so that handler, registry and
//! transport tests never need a network. It is a dev-dependency only; never
//! published.
//!
//! # Modules
//!
//! - [`stub`]: [`StubGitLab`] builder with canned responses and call recording
//! - [`fixtures`]: small constructors for upstream entities

pub mod fixtures;
pub mod stub;

pub use stub::{Call, StubGitLab, panicking_client};
