//! 通用工具

mod request_logger;

pub use request_logger::{LogEntry, RequestLogger};
