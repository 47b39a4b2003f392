//! 结果审阅会话
//!
//! 运行结束后，操作员在控制台中逐个查看结果，用外部文件提交新版本，
//! 撤销、重做、恢复原始版本，并保存单个或全部结果。
//! 会话是结果历史的唯一修改方。

use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::SessionError;
use crate::history::VersionedResult;
use crate::services::result_writer;

const HELP: &[(&str, &str)] = &[
    ("list", "列出全部结果"),
    ("show", "显示当前结果"),
    ("next / prev", "切换到下一个 / 上一个结果"),
    ("goto <n>", "切换到第 n 个结果"),
    ("edit <file>", "用文件内容提交新版本"),
    ("undo / redo", "撤销 / 重做"),
    ("restore", "恢复原始版本"),
    ("save [file]", "保存当前结果"),
    ("save-all", "保存全部结果"),
    ("help", "显示帮助"),
    ("quit", "退出"),
];

/// 审阅命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewCommand {
    List,
    Show,
    Next,
    Prev,
    /// 1 开始的序号
    Goto(usize),
    Edit(PathBuf),
    Undo,
    Redo,
    Restore,
    Save(Option<PathBuf>),
    SaveAll,
    Help,
    Quit,
}

impl ReviewCommand {
    /// 解析一行输入
    pub fn parse(line: &str) -> Result<Self, SessionError> {
        let line = line.trim();
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (line, None),
        };

        let command = match name.to_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "show" => Self::Show,
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Prev,
            "goto" | "g" => {
                let arg = arg.ok_or(SessionError::MissingArgument("goto"))?;
                let index = arg
                    .parse::<usize>()
                    .map_err(|_| SessionError::InvalidIndex(arg.to_string()))?;
                Self::Goto(index)
            }
            "edit" => Self::Edit(PathBuf::from(
                arg.ok_or(SessionError::MissingArgument("edit"))?,
            )),
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "restore" => Self::Restore,
            "save" => Self::Save(arg.map(PathBuf::from)),
            "save-all" => Self::SaveAll,
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return Err(SessionError::UnknownCommand(line.to_string())),
        };
        Ok(command)
    }
}

/// 执行一条命令后的下一步
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    /// 继续，附带要显示的文本
    Continue(String),
    Quit,
}

/// 审阅会话
pub struct ReviewSession {
    results: Vec<VersionedResult>,
    cursor: usize,
    output_dir: PathBuf,
}

impl ReviewSession {
    pub fn new(results: Vec<VersionedResult>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            results,
            cursor: 0,
            output_dir: output_dir.into(),
        }
    }

    pub fn results(&self) -> &[VersionedResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<VersionedResult> {
        self.results
    }

    /// 当前结果的序号（从0开始）
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&VersionedResult> {
        self.results.get(self.cursor)
    }

    fn current_mut(&mut self) -> Result<&mut VersionedResult, SessionError> {
        self.results
            .get_mut(self.cursor)
            .ok_or(SessionError::NoResults)
    }

    /// 解析并执行一行输入
    pub async fn execute(&mut self, line: &str) -> Result<SessionStep, SessionError> {
        let command = ReviewCommand::parse(line)?;
        self.apply(command).await
    }

    /// 执行一条命令
    pub async fn apply(&mut self, command: ReviewCommand) -> Result<SessionStep, SessionError> {
        let text = match command {
            ReviewCommand::List => self.render_list(),
            ReviewCommand::Show => self.render_current()?,
            ReviewCommand::Next => {
                if self.cursor + 1 < self.results.len() {
                    self.cursor += 1;
                }
                self.render_header()?
            }
            ReviewCommand::Prev => {
                self.cursor = self.cursor.saturating_sub(1);
                self.render_header()?
            }
            ReviewCommand::Goto(index) => {
                let total = self.results.len();
                if index == 0 || index > total {
                    return Err(SessionError::OutOfRange { index, total });
                }
                self.cursor = index - 1;
                self.render_header()?
            }
            ReviewCommand::Edit(path) => {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| SessionError::ReadFailed {
                        path: path.clone(),
                        source,
                    })?;
                self.current_mut()?.commit(text);
                format!("✅ 已提交新版本\n{}", self.render_header()?)
            }
            ReviewCommand::Undo => {
                let result = self.current_mut()?;
                if result.has_undo() {
                    result.undo();
                    format!("↶ 已撤销\n{}", self.render_header()?)
                } else {
                    "没有可撤销的版本".to_string()
                }
            }
            ReviewCommand::Redo => {
                let result = self.current_mut()?;
                if result.has_redo() {
                    result.redo();
                    format!("↷ 已重做\n{}", self.render_header()?)
                } else {
                    "没有可重做的版本".to_string()
                }
            }
            ReviewCommand::Restore => {
                self.current_mut()?.restore_original();
                format!("已恢复原始版本\n{}", self.render_header()?)
            }
            ReviewCommand::Save(target) => {
                let result = self.current().ok_or(SessionError::NoResults)?;
                let path = match target {
                    Some(path) => {
                        result_writer::save_to(result, &path).await?;
                        path
                    }
                    None => result_writer::save(result, &self.output_dir).await?,
                };
                format!("✅ 已保存到 {}", path.display())
            }
            ReviewCommand::SaveAll => {
                if self.results.is_empty() {
                    return Err(SessionError::NoResults);
                }
                let (dir, stats) = result_writer::save_all(&self.results, &self.output_dir).await?;
                format!(
                    "✅ 已保存到 {} (成功: {}, 错误: {})",
                    dir.display(),
                    stats.success,
                    stats.errors
                )
            }
            ReviewCommand::Help => render_help(),
            ReviewCommand::Quit => return Ok(SessionStep::Quit),
        };
        Ok(SessionStep::Continue(text))
    }

    /// 从标准输入读取命令，直到 quit 或输入结束
    pub async fn run_console(&mut self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{}", render_help());
        println!("{}", self.render_list());

        loop {
            print!("\n> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match self.execute(&line).await {
                Ok(SessionStep::Continue(text)) => println!("{}", text),
                Ok(SessionStep::Quit) => break,
                Err(e) => println!("❌ {}", e),
            }
        }
        Ok(())
    }

    // ========== 显示 ==========

    fn render_list(&self) -> String {
        if self.results.is_empty() {
            return "(没有结果)".to_string();
        }
        self.results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let marker = if i == self.cursor { "▶" } else { " " };
                format!("{} {:>3}. {}", marker, i + 1, describe(result))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_header(&self) -> Result<String, SessionError> {
        let result = self.current().ok_or(SessionError::NoResults)?;
        Ok(format!(
            "[{}/{}] {}",
            self.cursor + 1,
            self.results.len(),
            describe(result)
        ))
    }

    fn render_current(&self) -> Result<String, SessionError> {
        let result = self.current().ok_or(SessionError::NoResults)?;
        Ok(format!(
            "{}\n{}\n摘要: {}\nToken 用量: {}\n{}\n{}",
            self.render_header()?,
            "─".repeat(60),
            result.summary(),
            result.token_usage(),
            "─".repeat(60),
            result.code()
        ))
    }
}

fn describe(result: &VersionedResult) -> String {
    let history = result.history();
    format!(
        "{} {} (版本 {}/{})",
        if result.is_error() { "❌" } else { "✅" },
        result.label(),
        history.pointer() + 1,
        history.len()
    )
}

fn render_help() -> String {
    let mut text = String::from("可用命令:");
    for (command, description) in HELP {
        text.push_str(&format!("\n  {:<14} {}", command, description));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversionOutcome, ModelConfig, OutcomeKind, ProcessingMode, StructuredArtifact};
    use std::path::Path;
    use std::sync::Arc;

    fn result(name: &str, kind: OutcomeKind) -> VersionedResult {
        VersionedResult::new(ConversionOutcome {
            unit_label: name.to_string(),
            mode: ProcessingMode::Separate,
            source_paths: vec![PathBuf::from(name)],
            config: Arc::new(ModelConfig::default()),
            kind,
            diagnostics: Vec::new(),
        })
    }

    fn session(dir: &Path) -> ReviewSession {
        let ok = OutcomeKind::Success(
            StructuredArtifact::new("Base = declarative_base()".into(), "s".into(), 5).unwrap(),
        );
        let failed = OutcomeKind::Failure {
            message: "❌ 处理 b.png 失败".to_string(),
        };
        ReviewSession::new(vec![result("a.png", ok), result("b.png", failed)], dir)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReviewCommand::parse("goto 2").unwrap(), ReviewCommand::Goto(2));
        assert_eq!(
            ReviewCommand::parse("  edit  fixed.py ").unwrap(),
            ReviewCommand::Edit(PathBuf::from("fixed.py"))
        );
        assert_eq!(ReviewCommand::parse("save").unwrap(), ReviewCommand::Save(None));
        assert_eq!(ReviewCommand::parse("SAVE-ALL").unwrap(), ReviewCommand::SaveAll);
        assert!(matches!(
            ReviewCommand::parse("goto"),
            Err(SessionError::MissingArgument("goto"))
        ));
        assert!(matches!(
            ReviewCommand::parse("goto x"),
            Err(SessionError::InvalidIndex(_))
        ));
        assert!(matches!(
            ReviewCommand::parse("frobnicate"),
            Err(SessionError::UnknownCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_navigation_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        s.execute("prev").await.unwrap();
        assert_eq!(s.cursor(), 0);
        s.execute("next").await.unwrap();
        s.execute("next").await.unwrap();
        assert_eq!(s.cursor(), 1);
        s.execute("goto 1").await.unwrap();
        assert_eq!(s.cursor(), 0);
        assert!(matches!(
            s.execute("goto 3").await,
            Err(SessionError::OutOfRange { index: 3, total: 2 })
        ));
    }

    #[tokio::test]
    async fn test_edit_undo_redo_restore() {
        let dir = tempfile::tempdir().unwrap();
        let edit = dir.path().join("fixed.py");
        std::fs::write(&edit, "Base = declarative_base()\n# fixed").unwrap();
        let mut s = session(dir.path());

        s.execute("goto 2").await.unwrap();
        s.execute(&format!("edit {}", edit.display())).await.unwrap();
        assert_eq!(s.current().unwrap().code(), "Base = declarative_base()\n# fixed");

        s.execute("undo").await.unwrap();
        assert_eq!(s.current().unwrap().code(), "❌ 处理 b.png 失败");
        assert_eq!(
            s.execute("undo").await.unwrap(),
            SessionStep::Continue("没有可撤销的版本".to_string())
        );

        s.execute("redo").await.unwrap();
        assert!(s.current().unwrap().code().ends_with("# fixed"));

        s.execute("restore").await.unwrap();
        assert_eq!(s.current().unwrap().code(), "❌ 处理 b.png 失败");
        assert!(s.current().unwrap().has_redo());
    }

    #[tokio::test]
    async fn test_edit_missing_file_leaves_history_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        let err = s.execute("edit /definitely/missing.py").await.unwrap_err();
        assert!(matches!(err, SessionError::ReadFailed { .. }));
        assert_eq!(s.current().unwrap().history().len(), 1);
    }

    #[tokio::test]
    async fn test_save_and_save_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        s.execute("save").await.unwrap();
        assert!(dir.path().join("a_orm.py").exists());

        s.execute("save-all").await.unwrap();
        let saved = dir.path().join(result_writer::RESULTS_SUBDIR);
        assert!(saved.join("a_orm.py").exists());
        assert!(saved.join("b_orm.py").exists());
    }

    #[tokio::test]
    async fn test_empty_session_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = ReviewSession::new(Vec::new(), dir.path());

        assert!(matches!(s.execute("show").await, Err(SessionError::NoResults)));
        assert!(matches!(s.execute("undo").await, Err(SessionError::NoResults)));
        assert_eq!(s.execute("quit").await.unwrap(), SessionStep::Quit);
    }
}
