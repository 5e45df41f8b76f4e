pub mod app_config;
pub mod repository;
pub mod validation;

pub use app_config::*;
pub use repository::*;
pub use validation::*;
