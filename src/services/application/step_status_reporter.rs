/// 步骤状态上报门面
///
/// 列执行器通过此门面操作状态表格，不直接依赖表格服务的行模型。
/// 跳过决策在表格上是可见的无操作：错误行保留原样，便于事后追溯

use crate::services::application::test_sequence_service::TestSequenseService;
use crate::services::traits::ITestStep;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

pub struct StepStatusReporter {
    sequence: Arc<TestSequenseService>,
}

impl StepStatusReporter {
    pub fn new(sequence: Arc<TestSequenseService>) -> Self {
        Self { sequence }
    }

    /// 上报步骤开始，返回表格行的关联ID
    pub fn report_step_started(&self, step: &dyn ITestStep) -> Uuid {
        self.sequence.add_step(step.name(), step.description(), false)
    }

    /// 上报步骤成功
    pub fn report_success(&self, id: Uuid, message: &str) {
        self.sequence.set_success(id, message);
    }

    /// 上报步骤失败
    pub fn report_error(&self, id: Uuid, message: &str) {
        self.sequence.set_error(id, message);
    }

    /// 上报重试开始（复用原行）
    pub fn report_retry(&self, id: Uuid) {
        self.sequence.set_retrying(id);
    }

    /// 上报跳过决策
    ///
    /// 错误行保留在表格中不改写，仅记录运维日志
    pub fn report_skipped(&self, id: Uuid) {
        debug!("[StatusReporter] 步骤已跳过，错误行保留: {}", id);
    }

    /// 清空状态表格（硬复位）
    pub fn clear_all(&self) {
        self.sequence.clear_all();
    }

    /// 清空除扫码行外的表格（软复位）
    pub fn clear_all_except_scan(&self) {
        self.sequence.clear_all_except_scan();
    }
}
