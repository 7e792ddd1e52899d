pub mod actions;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod keyring;
pub mod notice;
pub mod repos;
pub mod sections;
pub mod session;
pub mod sse;
pub mod task;
