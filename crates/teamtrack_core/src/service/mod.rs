//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, authorization, cache and fan-out calls into
//!   the entry points consumed by route-handler collaborators.
//! - Keep transport layers decoupled from storage and policy details.

pub mod mutation;
pub mod notifications;
pub mod queries;
