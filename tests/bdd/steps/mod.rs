pub mod cli_steps;
pub mod common_steps;
pub mod http_steps;
pub mod meeting_steps;
pub mod task_steps;
pub mod user_steps;
