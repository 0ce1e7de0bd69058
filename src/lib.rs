pub mod cli;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod export;
pub mod matcher;
pub mod resolver;
pub mod scorer;
pub mod tabular;
