pub mod config;
pub mod error;
pub mod resolver;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{GraphError, Result};
pub use resolver::StaticResolver;
pub use traits::ConfigResolver;
pub use types::*;
