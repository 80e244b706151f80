//! Firmware Update Analyzer Library
//!
//! Extracts a canonical record and an update outcome for every managed
//! server of a prepared diagnostic bundle.

pub mod app;
pub mod classify;
pub mod errors;
pub mod extract;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod persist;
pub mod storage;

