use serde::{Deserialize, Serialize};

/// 测试执行全局状态
///
/// 状态机: Idle → Processing/Running → PausedOnError → Completed|Failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionState {
    /// 空闲，等待新的测试序列
    Idle,
    /// 预处理阶段（扫码、准备）
    Processing,
    /// 正在执行测试
    Running,
    /// 因步骤错误暂停，等待操作员决策
    PausedOnError,
    /// 全部完成且无失败
    Completed,
    /// 以失败结束（含硬复位放弃）
    Failed,
}

impl ExecutionState {
    /// 是否处于活动状态（正在执行或预处理）
    pub fn is_active(&self) -> bool {
        matches!(self, ExecutionState::Running | ExecutionState::Processing)
    }
}

/// 操作员对步骤错误的决策
///
/// 一次决策同时作用于所有当前失败的测试列
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorResolution {
    /// 无决策（取消等待时返回）
    None,
    /// 重试失败的步骤（同一个步骤实例）
    Retry,
    /// 跳过失败的步骤（错误行保留作为记录）
    Skip,
}

/// 停止测试的原因
///
/// 首个请求的原因被锁存，后续并发请求不覆盖
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionStopReason {
    None,
    /// 操作员手动停止
    Operator,
    /// 自动模式被关闭
    AutoModeDisabled,
    /// PLC强制停止信号
    PlcForceStop,
    /// PLC软复位（保留会话数据）
    PlcSoftReset,
    /// PLC硬复位（丢弃会话数据）
    PlcHardReset,
}

/// 环境中断原因（独立于步骤错误）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InterruptReason {
    /// 与PLC的连接丢失
    PlcConnectionLost,
    /// 自动模式被关闭
    AutoModeDisabled,
    /// 标签读取超时
    TagTimeout,
}

/// 中断的处理动作
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InterruptAction {
    /// 暂停共享令牌并等待恢复（可自动恢复）
    PauseAndWait,
    /// 延迟后执行硬复位（放弃当前测试）
    ResetAfterDelay,
}

/// 状态表格中单个步骤行的显示状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StepDisplayStatus {
    /// 正在执行
    Running,
    /// 正在重试
    Retrying,
    /// 成功完成
    Done,
    /// 步骤自行跳过
    Skipped,
    /// 执行出错（跳过决策后仍保留此显示）
    Error,
}
