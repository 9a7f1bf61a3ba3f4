/// 领域服务模块
///
/// 测试执行核心：列执行器、执行协调器、环境中断协调器
/// 及其共享的状态原语

/// 执行活动跟踪器
pub mod activity_tracker;

/// 测试列执行器
pub mod column_executor;

/// 环境中断协调器
pub mod error_coordinator;

/// 执行流程停止状态
pub mod execution_flow_state;

/// 执行状态管理器
pub mod execution_state_manager;

/// 协作式暂停令牌
pub mod pause_token;

/// 测试步骤执行上下文
pub mod step_context;

/// 测试执行协调器
pub mod test_execution_coordinator;

/// 测试地图
pub mod test_map;

pub use activity_tracker::ExecutionActivityTracker;
pub use column_executor::{ColumnExecutor, StepState};
pub use error_coordinator::ErrorCoordinator;
pub use execution_flow_state::ExecutionFlowState;
pub use execution_state_manager::ExecutionStateManager;
pub use pause_token::PauseTokenSource;
pub use step_context::TestStepContext;
pub use test_execution_coordinator::TestExecutionCoordinator;
pub use test_map::{TestMap, TestMapBuilder, TestMapRow, COLUMN_COUNT};
