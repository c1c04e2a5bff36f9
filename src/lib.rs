//! Beacon server installer
//!
//! Stages platform binaries, reconciles sample configuration against operator
//! customizations, and provisions the registration key on first install.

pub mod cli;
pub mod config;
pub mod install;
