pub mod annotation;
pub mod monthly_aggregator;

pub use annotation::*;
pub use monthly_aggregator::*;
