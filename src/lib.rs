//! Keyplace — installs a Google Cloud service-account key where the backend
//! container expects it.
//!
//! Finds the downloaded key in a few well-known places, copies it into
//! `credentials/`, restricts it to its owner, and checks that it parses.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod environment;
pub mod installer;
pub mod key;
pub mod logging;
pub mod permissions;
