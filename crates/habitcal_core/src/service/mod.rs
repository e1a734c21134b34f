//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate storage ports and the month cache into calendar use-cases.
//! - Keep UI layers decoupled from storage details.

pub mod calendar_service;
