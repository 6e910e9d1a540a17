//! Class enrollment and attendance coordination for academy-style cohorts.
//!
//! The [`classroom`] module owns the domain: class registry, enrollment rules, the join-request
//! queue, and attendance sessions. [`config`], [`telemetry`], and [`error`] carry the process
//! plumbing shared with the API service.

pub mod classroom;
pub mod config;
pub mod error;
pub mod telemetry;
