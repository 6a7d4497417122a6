//! Shared models for quickping: configuration, targets, outcomes and the
//! error taxonomy every layer reports through.

pub mod config;
pub mod error;
pub mod network;
pub mod outcome;
