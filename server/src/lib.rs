pub mod bootstrap;
pub mod config;
pub mod error;
pub mod http;
pub mod service;
