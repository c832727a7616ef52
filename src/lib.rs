//! Logs the S3 objects reported by object-creation notifications.

pub mod app;
pub mod conf;
pub mod trigger;
