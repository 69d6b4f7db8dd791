//! Shared runtime support for the widerow workspace.

pub mod telemetry;
