//! Command-line front end for tether sessions.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
