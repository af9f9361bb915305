// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod config;
pub mod images;
pub mod loader;
pub mod parser;
pub mod record;
pub mod sink;
pub mod value;
