pub mod cli;
pub mod client;
pub mod constants;
pub mod export;
pub mod measurement;
pub mod report;
pub mod server;
pub mod utils;
