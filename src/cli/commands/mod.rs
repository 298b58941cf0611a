//! CLI command implementations.

mod config;
mod corpus;
mod preprocess;
mod recommend;
mod serve;

pub use config::run_config;
pub use corpus::run_corpus;
pub use preprocess::run_preprocess;
pub use recommend::run_recommend;
pub use serve::run_serve;
