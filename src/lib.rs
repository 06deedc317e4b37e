pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod policy;
pub mod sample;
pub mod source;
