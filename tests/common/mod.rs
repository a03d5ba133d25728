#![allow(dead_code)]

pub mod fake_github;
pub mod fake_google;
mod test_server;

pub use test_server::{TestServer, data, error};
