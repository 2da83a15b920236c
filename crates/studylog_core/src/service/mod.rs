//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep request/view layers decoupled from storage details.

use chrono::{Local, NaiveDateTime, SubsecRound, Timelike};

pub mod admin_service;
pub mod demo_service;
pub mod post_service;
pub mod stats_service;

/// Current local wall-clock time at second precision.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Drops seconds so timestamps land on whole minutes.
pub(crate) fn truncate_to_minute(value: NaiveDateTime) -> NaiveDateTime {
    value.with_second(0).unwrap_or(value).trunc_subsecs(0)
}
