//! Domain model for tags, dated records and calendar months.
//!
//! # Responsibility
//! - Define canonical data structures used by the calendar core.
//! - Own the persisted text form of record values.
//!
//! # Invariants
//! - Every tag and record is identified by a stable UUID.
//! - A record value is a closed sum type; consumers match exhaustively.

pub mod calendar;
pub mod color;
pub mod record;
pub mod tag;
pub mod value;
