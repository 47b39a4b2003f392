//! 结果版本管理
//!
//! 每个处理结果附带一份线性的编辑历史，支持撤销、重做和恢复原始版本

pub mod version_history;
pub mod versioned_result;

pub use version_history::VersionHistory;
pub use versioned_result::VersionedResult;
