// lib.rs
pub mod chrom;
pub mod commands;
pub mod config;
pub mod json;
pub mod output;
pub mod pair;
pub mod reader;
pub mod region;
pub mod stats;
pub mod window;
