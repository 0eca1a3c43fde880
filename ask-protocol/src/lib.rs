//! Wire types for the Nova ask API.
//!
//! Serde-only crate shared by the engine and the HTTP server:
//! [`AskEvent`] is the tagged event stream emitted while a query runs, and
//! the `http` module holds the request/response bodies of the REST surface.
//! No I/O here; both sides agree on shapes through this crate.

mod event;
pub mod http;

pub use event::{AnswerSource, AskEvent};
