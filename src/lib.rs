pub mod codec;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod manager;
pub mod models;
pub mod registry;
pub mod render;
pub mod storage;
pub mod validation;

pub use error::{Error, Result};
