pub mod catalog;
pub mod config;
pub mod model;
pub mod platform;
pub mod state;
pub mod storage;
