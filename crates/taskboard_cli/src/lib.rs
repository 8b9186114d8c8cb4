pub mod cli;
pub mod datetime;
