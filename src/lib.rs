#![deny(missing_docs)]

//! Core library for the PDF digest service.

/// HTTP routing and the upload/download shell.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text extraction.
pub mod extraction;
/// Translation and summarization clients.
pub mod inference;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline run counters.
pub mod metrics;
/// Chunking, stage execution, and pipeline orchestration.
pub mod processing;
