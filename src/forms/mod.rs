//! Inbound request payloads.
pub mod main;
