#![allow(dead_code)]

pub mod caltree_env;
pub mod raw_data;
