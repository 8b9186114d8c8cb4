pub mod board;
pub mod config;
pub mod display;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod reminder;
pub mod storage;

pub use board::{BoardSettings, Stats, TaskBoard};
pub use error::AppError;
pub use filter::Filter;
