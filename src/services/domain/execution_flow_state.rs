/// 执行流程停止状态
///
/// 合并并发的停止请求：首个停止原因被锁存（后续请求不覆盖），
/// 失败标志在并发请求间做或运算，需要显式调用 `clear_stop` 清除

use crate::models::enums::ExecutionStopReason;
use crate::models::structs::FlowSnapshot;
use crate::services::infrastructure::ListenerRegistry;
use std::sync::Mutex;

pub struct ExecutionFlowState {
    inner: Mutex<FlowSnapshot>,
    on_changed: ListenerRegistry<FlowSnapshot>,
}

impl ExecutionFlowState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FlowSnapshot {
                reason: ExecutionStopReason::None,
                stop_as_failure: false,
            }),
            on_changed: ListenerRegistry::new("ExecutionFlowState"),
        }
    }

    /// 获取当前快照
    pub fn snapshot(&self) -> FlowSnapshot {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 是否已请求停止
    pub fn is_stop_requested(&self) -> bool {
        self.snapshot().reason != ExecutionStopReason::None
    }

    /// 请求停止
    ///
    /// 首个原因生效；`stop_as_failure` 按或运算累积
    pub fn request_stop(&self, reason: ExecutionStopReason, stop_as_failure: bool) {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.reason == ExecutionStopReason::None {
                inner.reason = reason;
            }
            inner.stop_as_failure |= stop_as_failure;
            *inner
        };
        self.on_changed.emit(&snapshot);
    }

    /// 显式清除停止状态（新一轮执行开始时调用）
    pub fn clear_stop(&self) {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.reason == ExecutionStopReason::None && !inner.stop_as_failure {
                return;
            }
            inner.reason = ExecutionStopReason::None;
            inner.stop_as_failure = false;
            *inner
        };
        self.on_changed.emit(&snapshot);
    }

    /// 变化事件注册表
    pub fn on_changed(&self) -> &ListenerRegistry<FlowSnapshot> {
        &self.on_changed
    }
}

impl Default for ExecutionFlowState {
    fn default() -> Self {
        Self::new()
    }
}
