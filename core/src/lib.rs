extern crate self as cat_core;

pub mod log;
