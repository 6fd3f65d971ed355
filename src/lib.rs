#![forbid(unsafe_code)]

//! Library half of the `sumvideo` archiver.
//!
//! The binary is a thin CLI over [`archive::archive_video`]; every step of the
//! pipeline lives in its own module so it can be exercised on its own.

pub mod archive;
pub mod cleanup;
pub mod config;
pub mod download;
pub mod metadata;
pub mod naming;
pub mod page;
pub mod reconcile;
