//! HTTP client for the Taskin REST API.
//!
//! The sync layer talks to the server exclusively through the [`TaskApi`]
//! trait. [`HttpTaskApi`] implements it with reqwest; with the
//! `test-support` feature enabled, `fake::FakeTaskApi` provides an
//! in-memory server for tests.
//!
//! # Endpoints
//!
//! All paths are relative to the configured base URL (`.../api`):
//!
//! - `GET categories`, `GET recommended-todos`, `GET oneoff-todos`
//! - `PATCH todos/{id}/status?status=...`
//! - `POST oneoff-todos`, `PATCH oneoff-todos/{id}`, `DELETE oneoff-todos/{id}`
//! - `PATCH oneoff-todos/{id}/status?status=...`
//! - `GET health`

pub mod api;
pub mod config;
pub mod error;
pub mod http;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use api::TaskApi;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use http::HttpTaskApi;
