pub mod control;
pub mod stats;
