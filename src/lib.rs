pub mod broker;
pub mod config;
pub mod container;
pub mod converter;
pub mod database;
pub mod error;
pub mod error_handler;
pub mod http;
pub mod receiver;
pub mod template;
pub mod types;
