//! # MTA Common Library
//!
//! Shared code for the Meeting Task Automation services:
//! - Error and result types
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - API response envelope types
//! - Timestamp utilities

pub mod api;
pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
