//! Core library for the Plaud/Claude note-taking plugin
//!
//! This library provides the business logic for the plugin: settings,
//! the outbound API clients, headless UI affordances and the plugin
//! lifecycle, exposed via a C FFI for integration with the host application.

pub mod api;
pub mod config;
pub mod inbox;
pub mod plugin;
pub mod settings;
pub mod ui;
mod ffi;

pub use ffi::*;
