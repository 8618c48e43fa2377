// src/services/mod.rs
pub mod classifier;
pub mod gemini;
pub mod history;
pub mod image_processor;
pub mod pricing;
pub mod tryon;

pub use history::{HistoryService, KvStore, MemoryStore, RedisStore};
pub use image_processor::ImageProcessor;
