/// 核心数据模型模块

/// 枚举类型定义
pub mod enums;

/// 结构体类型定义
pub mod structs;

/// 锅炉会话状态
pub mod boiler_state;

// 重新导出常用类型，方便使用
pub use boiler_state::{BoilerSession, BoilerState};
pub use enums::{
    ErrorResolution, ExecutionState, ExecutionStopReason, InterruptAction, InterruptReason,
    StepDisplayStatus,
};
pub use structs::{
    DeviceIoResult, ExecutionEvent, FlowSnapshot, InterruptBehavior, StepError, TestStepResult,
};
