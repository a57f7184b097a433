pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod parser;
pub mod sink;
