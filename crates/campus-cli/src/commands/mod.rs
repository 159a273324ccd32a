pub mod check;
pub mod common;
pub mod config;
pub mod decode;
pub mod serve;
