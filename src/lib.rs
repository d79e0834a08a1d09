pub mod app;
pub mod applier;
pub mod arg_parser;
pub mod command;
pub mod error_log;
pub mod errors;
pub mod logger;
pub mod power_limits;
pub mod smi;
