pub mod account;
pub mod config;
pub mod download;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod weburl;
