//! CLI command implementations

mod http;

pub mod init;
pub mod list;
pub mod scan;
pub mod serve;
pub mod status;
pub mod submit;
pub mod tools;
