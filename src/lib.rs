pub mod arguments;
pub mod chat;
pub mod config;
pub mod logger;
pub mod traffic;
pub mod webserver;
