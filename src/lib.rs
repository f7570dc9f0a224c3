#![forbid(unsafe_code)]

//! Vidshare: REST backend for a video-sharing platform.
//!
//! The binary in `src/bin/backend.rs` wires the pieces together; the library
//! exposes them so tests and tools can build the router against any store.

pub mod api;
pub mod config;
pub mod media;
pub mod store;
