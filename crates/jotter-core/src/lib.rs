//! Core types for the jotter action log.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! describes what an action looks like at every payload schema it has ever
//! been written with; storage and migration crates build on top of it.

pub mod action;
pub mod book;
pub mod error;

pub use error::{Error, Result};
