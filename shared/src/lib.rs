//! Shared building blocks for the comparison front end: configuration
//! handling, error types, the wire schema of the plagiarism backend and the
//! HTTP client that talks to it.

pub mod compare_client;
pub mod config;
pub mod dto;
pub mod error;
