pub mod config;
pub mod error;
pub mod taxonomy;
pub mod types;

pub use config::Config;
pub use error::{PipelineError, RejectReason};
pub use types::*;
