//! Main module for bpr library functionality

pub mod config;
pub mod export;
pub mod formats;
pub mod grammar;
pub mod loader;
pub mod optionals;
pub mod paths;
pub mod preparse;
pub mod token;
pub mod tokenizer;
