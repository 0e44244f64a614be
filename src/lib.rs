extern crate anyhow;
extern crate serde_derive;

pub mod config;
pub mod filter;
pub mod github;
pub mod notify;
pub mod smtp;
