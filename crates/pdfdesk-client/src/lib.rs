//! Native client for the PDF desk backend
//!
//! Drives the shared selection store and task tracker from `pdfdesk-core`
//! over HTTP. Files come from disk, requests go out with reqwest, and the
//! poll loop runs on tokio.

pub mod client;
pub mod desk;
pub mod error;
pub mod local;
pub mod poll;

pub use client::{Artifact, DeskClient};
pub use desk::Desk;
pub use error::ClientError;
pub use local::LocalFile;
pub use poll::{poll_until_done, ProgressSource};
