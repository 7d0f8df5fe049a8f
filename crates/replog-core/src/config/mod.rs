//! Configuration for the supervision crates

pub mod supervision;
pub mod traits;

pub use supervision::SupervisionConfig;
pub use traits::{ConfigValidation, TomlConfig};
