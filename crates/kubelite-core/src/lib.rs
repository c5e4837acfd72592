pub mod config;
pub mod constants;
pub mod validation;

pub use config::KubeliteConfig;
pub use validation::ValidationError;
