pub mod app;
pub mod batch;
pub mod cli;
pub mod config;
pub mod document;
pub mod history;
pub mod normalizer;
pub mod output;
pub mod record;
pub mod report;
pub mod runner;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
