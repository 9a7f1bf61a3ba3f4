/// 服务容器
///
/// 组装执行引擎的全部服务：共享状态原语、4个列执行器、
/// 执行协调器与环境中断协调器，并建立事件桥接

use crate::models::boiler_state::BoilerState;
use crate::models::structs::ExecutionEvent;
use crate::services::application::{
    ActiveErrorsService, InterruptMessageState, StepStatusReporter, TestSequenseService,
};
use crate::services::domain::{
    ColumnExecutor, ErrorCoordinator, ExecutionActivityTracker, ExecutionFlowState,
    ExecutionStateManager, PauseTokenSource, TestExecutionCoordinator, TestStepContext,
    COLUMN_COUNT,
};
use crate::services::infrastructure::{ListenerRegistry, LogRunLogger};
use crate::services::traits::{IDeviceService, ITestRunLogger};
use crate::utils::config::AppConfig;
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub struct ServiceContainer {
    pub device: Arc<dyn IDeviceService>,
    pub run_logger: Arc<dyn ITestRunLogger>,
    pub sequence: Arc<TestSequenseService>,
    pub status_reporter: Arc<StepStatusReporter>,
    pub pause_token: PauseTokenSource,
    pub state_manager: Arc<ExecutionStateManager>,
    pub flow_state: Arc<ExecutionFlowState>,
    pub activity_tracker: Arc<ExecutionActivityTracker>,
    pub boiler_state: Arc<BoilerState>,
    pub interrupt_message: Arc<InterruptMessageState>,
    pub active_errors: Arc<ActiveErrorsService>,
    pub events: Arc<ListenerRegistry<ExecutionEvent>>,
    pub coordinator: Arc<TestExecutionCoordinator>,
    pub error_coordinator: Arc<ErrorCoordinator>,
}

impl ServiceContainer {
    /// 用给定设备服务组装整套执行引擎
    pub fn new(config: &AppConfig, device: Arc<dyn IDeviceService>) -> Self {
        info!("[Container] 🚀 初始化服务容器");

        let run_logger: Arc<dyn ITestRunLogger> = Arc::new(LogRunLogger::new());
        let sequence = Arc::new(TestSequenseService::new());
        let status_reporter = Arc::new(StepStatusReporter::new(sequence.clone()));
        let pause_token = PauseTokenSource::new();
        let state_manager = Arc::new(ExecutionStateManager::new());
        let flow_state = Arc::new(ExecutionFlowState::new());
        let activity_tracker = Arc::new(ExecutionActivityTracker::new());
        let boiler_state = Arc::new(BoilerState::new());
        let interrupt_message = Arc::new(InterruptMessageState::new());
        let active_errors = Arc::new(ActiveErrorsService::new());
        let events = Arc::new(ListenerRegistry::new("ExecutionEvents"));

        // 全局状态变化桥接到统一事件流
        {
            let events = events.clone();
            state_manager.on_state_changed().subscribe(move |state| {
                events.emit(&ExecutionEvent::StateChanged(*state));
            });
        }

        let executors: [Arc<ColumnExecutor>; COLUMN_COUNT] = std::array::from_fn(|column_index| {
            let context = Arc::new(TestStepContext::new(
                column_index,
                device.clone(),
                pause_token.clone(),
            ));
            Arc::new(ColumnExecutor::new(
                column_index,
                context,
                pause_token.clone(),
                status_reporter.clone(),
                run_logger.clone(),
            ))
        });

        let coordinator = Arc::new(TestExecutionCoordinator::new(
            executors,
            state_manager.clone(),
            flow_state.clone(),
            pause_token.clone(),
            activity_tracker.clone(),
            events.clone(),
            run_logger.clone(),
        ));

        let error_coordinator = Arc::new(ErrorCoordinator::new(
            coordinator.clone(),
            pause_token.clone(),
            state_manager.clone(),
            status_reporter.clone(),
            boiler_state.clone(),
            activity_tracker.clone(),
            interrupt_message.clone(),
            active_errors.clone(),
            events.clone(),
            Duration::from_millis(config.interrupt_config.plc_reconnect_delay_ms),
        ));

        info!("[Container] ✅ 服务容器初始化完成");
        Self {
            device,
            run_logger,
            sequence,
            status_reporter,
            pause_token,
            state_manager,
            flow_state,
            activity_tracker,
            boiler_state,
            interrupt_message,
            active_errors,
            events,
            coordinator,
            error_coordinator,
        }
    }
}
