use std::sync::Arc;

/// 代码文本的线性版本历史
///
/// - `snapshots[0]` 为原始文本，永远不会被覆盖
/// - `0 <= pointer < snapshots.len()`
/// - 在撤销后提交会丢弃指针之后的所有版本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionHistory {
    snapshots: Vec<Arc<str>>,
    pointer: usize,
}

impl VersionHistory {
    /// 以原始文本创建历史
    pub fn new(original: impl Into<Arc<str>>) -> Self {
        Self {
            snapshots: vec![original.into()],
            pointer: 0,
        }
    }

    /// 当前版本文本
    pub fn current(&self) -> &str {
        &self.snapshots[self.pointer]
    }

    /// 原始版本文本
    pub fn original(&self) -> &str {
        &self.snapshots[0]
    }

    /// 提交新版本
    ///
    /// 如果指针不在最后，先截断指针之后的历史（重做记录丢失）。
    pub fn commit(&mut self, text: impl Into<Arc<str>>) -> &str {
        self.snapshots.truncate(self.pointer + 1);
        self.snapshots.push(text.into());
        self.pointer = self.snapshots.len() - 1;
        self.current()
    }

    /// 撤销：回到上一个版本，已在最早版本时不变
    pub fn undo(&mut self) -> &str {
        if self.pointer > 0 {
            self.pointer -= 1;
        }
        self.current()
    }

    /// 重做：前进到下一个版本，已在最新版本时不变
    pub fn redo(&mut self) -> &str {
        if self.pointer + 1 < self.snapshots.len() {
            self.pointer += 1;
        }
        self.current()
    }

    /// 恢复原始版本（不删除后续历史）
    pub fn restore_original(&mut self) -> &str {
        self.pointer = 0;
        self.current()
    }

    pub fn has_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn has_redo(&self) -> bool {
        self.pointer + 1 < self.snapshots.len()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// 历史至少包含原始版本，永远不为空
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 全部版本（只读）
    pub fn snapshots(&self) -> impl Iterator<Item = &str> {
        self.snapshots.iter().map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(texts: &[&str]) -> VersionHistory {
        let mut history = VersionHistory::new(texts[0]);
        for text in &texts[1..] {
            history.commit(*text);
        }
        history
    }

    #[test]
    fn test_commit_after_undo_truncates_redo() {
        let mut history = history_of(&["v1", "v2", "v3"]);
        history.undo();
        assert_eq!(history.undo(), "v1");

        history.commit("v4");

        assert_eq!(history.snapshots().collect::<Vec<_>>(), vec!["v1", "v4"]);
        assert_eq!(history.pointer(), 1);
        assert!(!history.has_redo());
        assert_eq!(history.redo(), "v4");
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = history_of(&["a", "b", "c"]);
        history.undo();

        for _ in 0..3 {
            let before = history.current().to_string();
            if history.has_undo() {
                history.undo();
                assert_eq!(history.redo(), before);
            }
            history.undo();
        }
    }

    #[test]
    fn test_undo_redo_are_noops_at_bounds() {
        let mut history = history_of(&["only"]);
        assert!(!history.has_undo());
        assert!(!history.has_redo());
        assert_eq!(history.undo(), "only");
        assert_eq!(history.redo(), "only");
        assert_eq!(history.pointer(), 0);
    }

    #[test]
    fn test_restore_original_keeps_later_history_until_commit() {
        let mut history = history_of(&["orig", "e1", "e2"]);

        assert_eq!(history.restore_original(), "orig");
        assert_eq!(history.len(), 3);
        assert!(history.has_redo());
        assert_eq!(history.redo(), "e1");

        history.restore_original();
        history.commit("fresh");
        assert_eq!(history.snapshots().collect::<Vec<_>>(), vec!["orig", "fresh"]);
    }

    #[test]
    fn test_original_survives_any_sequence() {
        let mut history = VersionHistory::new("seed");
        for i in 0..20 {
            match i % 4 {
                0 => {
                    history.commit(format!("edit {}", i));
                }
                1 => {
                    history.undo();
                }
                2 => {
                    history.redo();
                }
                _ => {
                    history.undo();
                    history.undo();
                    history.commit(format!("branch {}", i));
                }
            }
            assert!(history.pointer() < history.len());
            assert_eq!(history.original(), "seed");
        }
        assert_eq!(history.restore_original(), "seed");
    }
}
