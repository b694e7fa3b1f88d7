pub mod source;
pub mod web;

pub use source::{NavigateOptions, PageSource, WaitStrategy};
pub use web::WebDriverSource;
