//! vidtool - front end for composite audio/video fixes
//!
//! This library crate exposes configuration and command handling for
//! integration testing.

pub mod commands;
pub mod config;
