//! Data migrations over the jotter action log.
//!
//! Two independent tracks share one runner:
//!
//! - the **local** track upgrades stored action payloads to their newest
//!   schema ([`local::local_sequence`]);
//! - the **remote** track replaces locally generated book uuids with the ones
//!   the server assigned ([`remote::remote_sequence`]).
//!
//! Each track keeps its own counter in the `system` table. A step and the
//! counter bump that records it commit in the same transaction, so an
//! interrupted run resumes at the first step that did not commit.

pub mod client;
pub mod error;
pub mod local;
pub mod remote;
pub mod runner;

pub use client::{ApiClient, ApiConfig};
pub use error::{Error, ErrorKind, Result};
pub use runner::{Body, Context, Migration, Track, run, run_all};
