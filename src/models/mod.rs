//! 数据模型

mod notification;

pub use notification::{is_present, SuggestionRequest, SuggestionResponse};
