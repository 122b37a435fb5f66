//! # boardsync-github
//!
//! GitHub Projects (v2) as a [`BoardReader`](boardsync_sync::BoardReader) /
//! [`BoardWriter`](boardsync_sync::BoardWriter), over the GraphQL API.
//!
//! Content mapping: `DraftIssue` → draft, `Issue` → issue, `PullRequest` →
//! pull request. Issue and pull request labels double as scope markers.

pub mod client;
mod queries;
pub mod transport;

pub use client::GithubClient;
pub use transport::{HttpTransport, Transport};
