pub mod pipeline_config;
pub mod scraper_config;

pub use pipeline_config::*;
pub use scraper_config::*;
