//! A small blocking Rust client for servers implementing OGC API - Processes.
//!
//! The [`Client`] maps each Part 1 (Core) operation onto one HTTP call against a
//! configurable base URL: conformance, process list and description, process
//! execution, job list, job status, job results and job dismissal.
//!
//! ## Quick start
//! - Point the client at an API root via `OGCAPI_URL`, an `.ogcapirc` file, or
//!   pass the URL explicitly. Without any configuration the public GeoLabs
//!   test server is used.
//! - Call one of the operations; JSON documents come back as [`serde_json::Value`].
//!
//! ```no_run
//! use anyhow::Result;
//! use ogc_processes::{Client, ExecutionMode};
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let client = Client::new(Some("http://tb17.geolabs.fr:8101/ogc-api".into()), None, None)?;
//!     println!("{:#}", client.get_process_list(5)?);
//!
//!     let outcome = client.post_process_execution(
//!         "echo",
//!         &json!({ "a": "hello" }),
//!         ExecutionMode::Async,
//!     )?;
//!     if let Some(job_id) = outcome.job_id {
//!         let status = client.wait_for_job(&job_id)?;
//!         println!("job finished as {}", status.status);
//!         println!("{:#}", client.get_job_results(&job_id)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Failed requests surface as [`anyhow::Error`] values wrapping an [`ApiError`],
//! which carries the HTTP status and the server's exception report, if any.

#![forbid(unsafe_code)]

mod client;
mod config;
mod dispatch;
mod error;
mod models;
mod util;

pub use client::{Client, ClientConfig};
pub use config::DEFAULT_BASE_URL;
pub use dispatch::{Function, Request, dispatch};
pub use error::{ApiError, ExceptionReport};
pub use models::{ExecutionMode, ExecutionOutcome, JobStatus, Link, StatusInfo};
