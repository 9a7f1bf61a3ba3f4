/// 锅炉终检台测试执行引擎
///
/// 4列并行的测试序列编排核心：
/// - 列执行器按测试地图顺序执行本列步骤，失败在列内锁存
/// - 执行协调器以地图为屏障推进4列，暂停回合等待操作员重试/跳过决策
/// - 环境中断协调器监听PLC连通性与自动模式信号，暂停或复位测试台

/// 核心数据模型
pub mod models;

/// 服务层
pub mod services;

/// 工具模块
pub mod utils;

pub use models::{
    DeviceIoResult, ErrorResolution, ExecutionEvent, ExecutionState, ExecutionStopReason,
    StepError, TestStepResult,
};
pub use services::{IDeviceService, ITestRunLogger, ITestStep, ServiceContainer};
pub use utils::error::{AppError, AppResult};
