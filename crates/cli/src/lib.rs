//! Public library modules for the CLI crate
pub mod bulk;
pub mod report;
pub mod settings;
