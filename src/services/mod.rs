pub mod ai_service;
pub mod parser_service;
pub mod prompt_service;
pub mod quiz_service;
pub mod session_service;
