pub mod html_client;
pub mod products_fetcher;
pub mod reviews_fetcher;
pub mod testimonials_fetcher;

pub use html_client::*;
pub use products_fetcher::*;
pub use reviews_fetcher::*;
pub use testimonials_fetcher::*;
