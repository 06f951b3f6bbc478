pub mod config;
pub mod logging;

pub mod bot;
pub mod control;
pub mod error;
pub mod extractor;
pub mod inline_media;
pub mod scheduler;
pub mod storage;
pub mod url_model;
