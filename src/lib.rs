// src/lib.rs

//! sunup Daily Digest Library

pub mod error;
pub mod mail;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod services;
pub mod storage;
pub mod utils;
