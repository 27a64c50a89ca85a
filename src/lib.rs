pub mod admin;
pub mod authoring;
pub mod cli;
pub mod config;
pub mod export;
pub mod model;
pub mod server;
pub mod storage;
pub mod taking;
