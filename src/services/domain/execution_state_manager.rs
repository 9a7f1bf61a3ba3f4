/// 执行状态管理器
///
/// 全局执行状态机与待处理步骤错误队列的唯一持有者。
/// 状态机: Idle → Processing/Running → PausedOnError → Completed|Failed。
/// 每次状态转换都会广播给订阅者（订阅者异常相互隔离）

use crate::models::enums::ExecutionState;
use crate::models::structs::StepError;
use crate::services::infrastructure::ListenerRegistry;
use log::debug;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub struct ExecutionStateManager {
    state: Mutex<ExecutionState>,
    /// 待处理错误队列，按列索引去重：
    /// 已在队列中的列再次失败会被静默吸收
    error_queue: Mutex<VecDeque<StepError>>,
    /// 本轮执行中是否发生过跳过决策
    had_skipped_error: AtomicBool,
    on_state_changed: ListenerRegistry<ExecutionState>,
}

impl ExecutionStateManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ExecutionState::Idle),
            error_queue: Mutex::new(VecDeque::new()),
            had_skipped_error: AtomicBool::new(false),
            on_state_changed: ListenerRegistry::new("ExecutionStateManager"),
        }
    }

    /// 当前状态
    pub fn state(&self) -> ExecutionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 是否处于活动状态
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// 是否存在待处理错误
    pub fn has_pending_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 待处理错误数量
    pub fn error_count(&self) -> usize {
        self.error_queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 本轮执行中是否发生过跳过
    pub fn had_skipped_error(&self) -> bool {
        self.had_skipped_error.load(Ordering::SeqCst)
    }

    /// 记录一次跳过决策
    pub fn mark_error_skipped(&self) {
        self.had_skipped_error.store(true, Ordering::SeqCst);
    }

    /// 重置跳过记录（新一轮执行开始时调用）
    pub fn reset_error_tracking(&self) {
        self.had_skipped_error.store(false, Ordering::SeqCst);
    }

    /// 状态转换并广播
    pub fn transition_to(&self, new_state: ExecutionState) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == new_state {
                return;
            }
            debug!("[StateManager] 状态转换: {:?} -> {:?}", *state, new_state);
            *state = new_state;
        }
        self.on_state_changed.emit(&new_state);
    }

    /// 入队步骤错误（按列索引去重）
    ///
    /// 返回是否实际入队；同一列的重复失败被吸收
    pub fn enqueue_error(&self, error: StepError) -> bool {
        let inserted = {
            let mut queue = self.error_queue.lock().unwrap_or_else(|e| e.into_inner());
            if queue.iter().any(|e| e.column_index == error.column_index) {
                false
            } else {
                queue.push_back(error);
                true
            }
        };
        if inserted {
            self.on_state_changed.emit(&self.state());
        }
        inserted
    }

    /// 查看队首错误（当前暂停回合的代表错误）
    pub fn current_error(&self) -> Option<StepError> {
        self.error_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .front()
            .cloned()
    }

    /// 移除指定列的待处理错误（该列重试成功后调用）
    pub fn remove_error_for_column(&self, column_index: usize) {
        let removed = {
            let mut queue = self.error_queue.lock().unwrap_or_else(|e| e.into_inner());
            let before = queue.len();
            queue.retain(|e| e.column_index != column_index);
            queue.len() != before
        };
        if removed {
            self.on_state_changed.emit(&self.state());
        }
    }

    /// 清空全部待处理错误
    pub fn clear_errors(&self) {
        {
            let mut queue = self.error_queue.lock().unwrap_or_else(|e| e.into_inner());
            if queue.is_empty() {
                return;
            }
            queue.clear();
        }
        self.on_state_changed.emit(&self.state());
    }

    /// 状态变化事件注册表
    pub fn on_state_changed(&self) -> &ListenerRegistry<ExecutionState> {
        &self.on_state_changed
    }
}

impl Default for ExecutionStateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_error(column_index: usize) -> StepError {
        StepError {
            column_index,
            step_name: "测试步骤".to_string(),
            step_description: String::new(),
            error_message: "失败".to_string(),
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4(),
        }
    }

    /// 同一列的重复错误被吸收
    #[test]
    fn test_enqueue_deduplicates_by_column() {
        let manager = ExecutionStateManager::new();
        assert!(manager.enqueue_error(make_error(0)));
        assert!(!manager.enqueue_error(make_error(0)));
        assert!(manager.enqueue_error(make_error(2)));
        assert_eq!(manager.error_count(), 2);
        assert_eq!(manager.current_error().unwrap().column_index, 0);
    }

    /// 按列移除错误
    #[test]
    fn test_remove_error_for_column() {
        let manager = ExecutionStateManager::new();
        manager.enqueue_error(make_error(0));
        manager.enqueue_error(make_error(1));

        manager.remove_error_for_column(0);
        assert_eq!(manager.error_count(), 1);
        assert_eq!(manager.current_error().unwrap().column_index, 1);
    }

    /// 状态转换广播给订阅者
    #[test]
    fn test_transition_broadcasts() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        let manager = ExecutionStateManager::new();
        let transitions = Arc::new(AtomicUsize::new(0));
        let transitions_clone = transitions.clone();
        manager.on_state_changed().subscribe(move |_| {
            transitions_clone.fetch_add(1, Ordering::SeqCst);
        });

        manager.transition_to(ExecutionState::Running);
        // 相同状态不重复广播
        manager.transition_to(ExecutionState::Running);
        manager.transition_to(ExecutionState::Completed);

        assert_eq!(transitions.load(Ordering::SeqCst), 2);
        assert_eq!(manager.state(), ExecutionState::Completed);
    }

    /// 跳过标志的记录与重置
    #[test]
    fn test_skip_tracking() {
        let manager = ExecutionStateManager::new();
        assert!(!manager.had_skipped_error());
        manager.mark_error_skipped();
        assert!(manager.had_skipped_error());
        manager.reset_error_tracking();
        assert!(!manager.had_skipped_error());
    }
}
