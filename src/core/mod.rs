pub mod config;
pub mod types;

pub use config::{
    ConfigArgs, LookupMode, ServerSettings, TerminologyConfig, ValidationConfig, ValidatorConfig,
};
pub use types::*;
