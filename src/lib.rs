//! Grade crawler for the Dualis student portal.

pub mod app;
pub mod cli;
pub mod config;
pub mod diff;
pub mod dualis;
pub mod fmt;
pub mod logging;
pub mod notify;
pub mod store;
pub mod utils;
