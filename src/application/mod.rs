//! Application services: one module per pipeline command.

pub mod build;
pub mod clean;
pub mod content;
pub mod error;
pub mod preview;
pub mod publish;
pub mod qr;
pub mod scaffold;
pub mod tooling;
