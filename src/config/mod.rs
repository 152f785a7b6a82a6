// src/config/mod.rs
pub mod osint;

pub use osint::{Credentials, Endpoints, Limits, OsintConfig, Timeouts};
