//! 服务层模块

mod llm_service;
mod output_parser;
mod prompt_service;
mod suggestion_service;

pub use llm_service::LlmService;
pub use suggestion_service::{SuggestionError, SuggestionService};
