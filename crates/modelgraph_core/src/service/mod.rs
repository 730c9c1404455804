//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store mutations into use-case level APIs.
//! - Keep callers decoupled from notation rule details.

pub mod modeling_service;
