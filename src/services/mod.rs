//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，不关心流程顺序

pub mod failure_log;
pub mod prompt_assembler;
pub mod response_parser;
pub mod result_writer;
pub mod run_report;

pub use failure_log::FailureLog;
pub use prompt_assembler::{AssembledPrompt, PromptAssembler};
pub use response_parser::parse_reply;
pub use result_writer::SaveStats;
pub use run_report::RunReport;
