use crate::models::enums::{ExecutionState, ExecutionStopReason, InterruptAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 测试步骤的执行结果
///
/// 由具体步骤返回，`success=false` 表示步骤级失败（由操作员通过重试/跳过解决），
/// `skipped=true` 表示步骤自行判断不适用并跳过
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStepResult {
    /// 是否成功
    pub success: bool,
    /// 结果消息（测量值、错误描述等）
    pub message: String,
    /// 步骤是否自行跳过
    pub skipped: bool,
}

impl TestStepResult {
    /// 创建成功结果
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            skipped: false,
        }
    }

    /// 创建失败结果
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            skipped: false,
        }
    }

    /// 创建跳过结果
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            skipped: true,
        }
    }
}

/// 步骤错误信息
///
/// 每个暂停回合只创建一次（按列索引顺序取第一个失败列；
/// 暂停期间其它列的并发失败被吸收，不再重复上报）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    /// 失败的测试列索引（0..3）
    pub column_index: usize,
    /// 步骤名称
    pub step_name: String,
    /// 步骤描述
    pub step_description: String,
    /// 错误消息
    pub error_message: String,
    /// 发生时间
    pub timestamp: DateTime<Utc>,
    /// 状态表格行的关联ID
    pub correlation_id: Uuid,
}

/// 设备读写操作的统一结果契约
///
/// 执行核心只依赖该契约，不关心具体通信协议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceIoResult {
    /// 操作是否成功
    pub success: bool,
    /// 读取到的值（写操作为None）
    pub value: Option<serde_json::Value>,
    /// 失败时的错误描述
    pub error: Option<String>,
}

impl DeviceIoResult {
    /// 创建成功的读结果
    pub fn ok_value(value: serde_json::Value) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
        }
    }

    /// 创建成功的写结果
    pub fn ok() -> Self {
        Self {
            success: true,
            value: None,
            error: None,
        }
    }

    /// 创建失败结果
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(error.into()),
        }
    }
}

/// 中断行为定义（静态表的条目）
#[derive(Debug, Clone)]
pub struct InterruptBehavior {
    /// 展示给操作员的消息
    pub message: &'static str,
    /// 处理动作
    pub action: InterruptAction,
    /// ResetAfterDelay 的可选延迟
    pub delay: Option<Duration>,
}

/// 执行流程快照（停止原因 + 是否按失败结算）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub reason: ExecutionStopReason,
    pub stop_as_failure: bool,
}

/// 执行引擎对外广播的事件
///
/// 驱动外部UI对话框与横幅；订阅者异常相互隔离
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
    /// 全局状态变化
    StateChanged(ExecutionState),
    /// 发生步骤错误，等待操作员决策
    ErrorOccurred(StepError),
    /// 重试开始
    RetryStarted,
    /// 测试序列结束
    SequenceCompleted { success: bool },
    /// 硬复位已执行（会话被放弃）
    Reset,
    /// 中断恢复（暂停已解除）
    Recovered,
}
