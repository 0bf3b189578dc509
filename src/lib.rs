//! # buffered-blob
//!
//! Chunked file I/O, streaming downloads and file hashing behind opaque handle ids.
//!
//! Features:
//! - Sequential chunked reads and writes with bounded buffers
//! - Cancellable streaming downloads with progress reporting
//! - SHA-256 / MD5 file digests
//! - Stable `[CODE] message` error contract

pub mod error;
pub mod blob_configuration;
pub mod handle_registry;
pub mod chunked_reader;
pub mod chunked_writer;
pub mod download_status;
pub mod download_progress;
mod download_stream;
pub mod downloader;
pub mod hash;
pub mod file_info;
pub mod file_ops;
pub mod paths;
pub mod blob_service;

pub use blob_service::BlobService;
pub use error::{BlobError, ErrorCode, Result};
