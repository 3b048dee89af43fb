//! Adapters for the external tools and services the pipeline drives.

pub mod cloudflare;
pub mod error;
pub mod git;
pub mod hugo;
pub mod process;
pub mod telemetry;
pub mod wrangler;
