/// 服务层核心接口定义
///
/// 执行核心只依赖这些契约，不依赖具体的通信协议或UI实现

use crate::models::{DeviceIoResult, TestStepResult};
use crate::services::domain::step_context::TestStepContext;
use crate::utils::error::AppResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 测试步骤接口
///
/// `name`/`description`/`id` 为静态元数据；`execute` 为长耗时设备I/O操作。
/// 步骤返回 `TestStepResult` 表达业务级成败，用 `Err` 表达异常；
/// 两者在列执行器边界统一归一为失败状态，绝不向协调器传播
#[async_trait]
pub trait ITestStep: Send + Sync {
    /// 步骤名称（显示在状态表格中）
    fn name(&self) -> &str;

    /// 步骤描述
    fn description(&self) -> &str;

    /// 步骤唯一标识
    fn id(&self) -> &str;

    /// 执行步骤
    async fn execute(
        &self,
        context: &TestStepContext,
        ct: &CancellationToken,
    ) -> AppResult<TestStepResult>;
}

/// 设备通信服务接口
///
/// 读写契约统一为 `DeviceIoResult {success, value?, error?}`
#[async_trait]
pub trait IDeviceService: Send + Sync {
    /// 读取标签值
    async fn read_tag(&self, address: &str) -> AppResult<DeviceIoResult>;

    /// 写入标签值
    async fn write_tag(&self, address: &str, value: serde_json::Value) -> AppResult<DeviceIoResult>;

    /// 设备当前是否在线
    fn is_connected(&self) -> bool;
}

/// 面向操作员的运行日志接口
///
/// 与 `log` 宏的运维日志并行的第二个日志汇：按步骤记录人类可读的测试过程
pub trait ITestRunLogger: Send + Sync {
    /// 记录步骤开始
    fn log_step_start(&self, step_name: &str);

    /// 记录步骤成功结束
    fn log_step_end(&self, step_name: &str);

    /// 记录普通信息（结果值等）
    fn log_information(&self, message: &str);

    /// 记录警告
    fn log_warning(&self, message: &str);

    /// 记录错误
    fn log_error(&self, message: &str);
}
