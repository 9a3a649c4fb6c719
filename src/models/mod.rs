pub mod answer;
pub mod difficulty;
pub mod question;
pub mod quiz_config;
pub mod quiz_session;
