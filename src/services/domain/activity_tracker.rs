/// 执行活动跟踪器
///
/// 记录测试执行与预处理是否处于活动状态；
/// 中断协调器据此决定环境信号是否需要处理
/// （空闲时的断线/自动模式切换不触发中断）

use std::sync::atomic::{AtomicBool, Ordering};

pub struct ExecutionActivityTracker {
    test_execution_active: AtomicBool,
    preparation_active: AtomicBool,
}

impl ExecutionActivityTracker {
    pub fn new() -> Self {
        Self {
            test_execution_active: AtomicBool::new(false),
            preparation_active: AtomicBool::new(false),
        }
    }

    /// 设置测试执行活动标志（由执行协调器维护）
    pub fn set_test_execution_active(&self, active: bool) {
        self.test_execution_active.store(active, Ordering::SeqCst);
    }

    /// 设置预处理活动标志（扫码、准备流程）
    pub fn set_preparation_active(&self, active: bool) {
        self.preparation_active.store(active, Ordering::SeqCst);
    }

    /// 测试执行是否活动
    pub fn is_test_execution_active(&self) -> bool {
        self.test_execution_active.load(Ordering::SeqCst)
    }

    /// 是否存在任何活动
    pub fn is_any_active(&self) -> bool {
        self.test_execution_active.load(Ordering::SeqCst)
            || self.preparation_active.load(Ordering::SeqCst)
    }
}

impl Default for ExecutionActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}
