/// 环境中断协调器
///
/// 监听执行环境信号（PLC连通性、自动模式就绪），在测试活动期间
/// 发生环境异常时按静态行为表处理：暂停等待恢复，或延迟后复位。
/// 中断处理单飞：处理期间到达的新中断被丢弃（记录警告）

use crate::models::boiler_state::BoilerState;
use crate::models::enums::{ExecutionState, ExecutionStopReason, InterruptAction, InterruptReason};
use crate::models::structs::{ExecutionEvent, InterruptBehavior};
use crate::services::application::{
    ActiveErrorsService, InterruptMessageState, StepStatusReporter, ERR_PLC_CONNECTION_LOST,
    ERR_TAG_READ_TIMEOUT,
};
use crate::services::domain::activity_tracker::ExecutionActivityTracker;
use crate::services::domain::execution_state_manager::ExecutionStateManager;
use crate::services::domain::pause_token::PauseTokenSource;
use crate::services::domain::test_execution_coordinator::TestExecutionCoordinator;
use crate::services::infrastructure::ListenerRegistry;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

/// 中断行为静态表（PLC断线的等待窗口在构造时按配置覆盖）
static DEFAULT_BEHAVIORS: Lazy<HashMap<InterruptReason, InterruptBehavior>> = Lazy::new(|| {
    let mut behaviors = HashMap::new();
    behaviors.insert(
        InterruptReason::PlcConnectionLost,
        InterruptBehavior {
            message: "PLC连接丢失，等待恢复…",
            action: InterruptAction::ResetAfterDelay,
            delay: Some(Duration::from_secs(5)),
        },
    );
    behaviors.insert(
        InterruptReason::AutoModeDisabled,
        InterruptBehavior {
            message: "自动模式已关闭，请恢复自动模式后继续",
            action: InterruptAction::PauseAndWait,
            delay: None,
        },
    );
    behaviors.insert(
        InterruptReason::TagTimeout,
        InterruptBehavior {
            message: "标签读取超时，测试台将复位",
            action: InterruptAction::ResetAfterDelay,
            delay: None,
        },
    );
    behaviors
});

pub struct ErrorCoordinator {
    behaviors: HashMap<InterruptReason, InterruptBehavior>,
    coordinator: Arc<TestExecutionCoordinator>,
    pause_token: PauseTokenSource,
    state_manager: Arc<ExecutionStateManager>,
    status_reporter: Arc<StepStatusReporter>,
    boiler_state: Arc<BoilerState>,
    activity_tracker: Arc<ExecutionActivityTracker>,
    interrupt_message: Arc<InterruptMessageState>,
    active_errors: Arc<ActiveErrorsService>,
    events: Arc<ListenerRegistry<ExecutionEvent>>,
    /// 中断处理单飞标志
    handling_interrupt: AtomicBool,
    /// 序列化中断处理与恢复/复位操作
    op_lock: Mutex<()>,
    /// 协调器生命周期令牌（shutdown 时触发）
    lifetime: CancellationToken,
}

impl ErrorCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        coordinator: Arc<TestExecutionCoordinator>,
        pause_token: PauseTokenSource,
        state_manager: Arc<ExecutionStateManager>,
        status_reporter: Arc<StepStatusReporter>,
        boiler_state: Arc<BoilerState>,
        activity_tracker: Arc<ExecutionActivityTracker>,
        interrupt_message: Arc<InterruptMessageState>,
        active_errors: Arc<ActiveErrorsService>,
        events: Arc<ListenerRegistry<ExecutionEvent>>,
        plc_reconnect_delay: Duration,
    ) -> Self {
        let mut behaviors = DEFAULT_BEHAVIORS.clone();
        if let Some(behavior) = behaviors.get_mut(&InterruptReason::PlcConnectionLost) {
            behavior.delay = Some(plc_reconnect_delay);
        }

        Self {
            behaviors,
            coordinator,
            pause_token,
            state_manager,
            status_reporter,
            boiler_state,
            activity_tracker,
            interrupt_message,
            active_errors,
            events,
            handling_interrupt: AtomicBool::new(false),
            op_lock: Mutex::new(()),
            lifetime: CancellationToken::new(),
        }
    }

    /// 启动环境信号监听任务
    ///
    /// `connectivity_rx` 为PLC连通性信号，`auto_ready_rx` 为自动模式就绪信号。
    /// 空闲时（无任何测试活动）的环境变化不触发中断
    pub fn start(
        self: &Arc<Self>,
        mut connectivity_rx: watch::Receiver<bool>,
        mut auto_ready_rx: watch::Receiver<bool>,
    ) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.lifetime.cancelled() => break,
                    changed = connectivity_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let connected = *connectivity_rx.borrow_and_update();
                        if connected {
                            this.try_resume_from_pause().await;
                        } else if this.activity_tracker.is_any_active() {
                            this.handle_interrupt(InterruptReason::PlcConnectionLost).await;
                        }
                    }
                }
            }
        });

        let this = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.lifetime.cancelled() => break,
                    changed = auto_ready_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let ready = *auto_ready_rx.borrow_and_update();
                        if ready {
                            this.try_resume_from_pause().await;
                        } else if this.activity_tracker.is_any_active() {
                            this.handle_interrupt(InterruptReason::AutoModeDisabled).await;
                        }
                    }
                }
            }
        });
    }

    /// 处理一次环境中断
    ///
    /// 单飞：已有中断在处理时新中断被丢弃
    pub async fn handle_interrupt(&self, reason: InterruptReason) {
        if self
            .handling_interrupt
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("[ErrorCoordinator] 中断处理进行中，丢弃新中断: {:?}", reason);
            return;
        }

        let behavior = match self.behaviors.get(&reason) {
            Some(behavior) => behavior.clone(),
            None => {
                self.handling_interrupt.store(false, Ordering::SeqCst);
                return;
            }
        };

        {
            let _guard = self.op_lock.lock().await;
            info!("[ErrorCoordinator] 环境中断: {:?} - {}", reason, behavior.message);
            self.interrupt_message.set_message(behavior.message);
            self.pause_token.pause();
            match reason {
                InterruptReason::PlcConnectionLost => {
                    self.active_errors
                        .raise(ERR_PLC_CONNECTION_LOST, behavior.message);
                }
                InterruptReason::TagTimeout => {
                    self.active_errors
                        .raise(ERR_TAG_READ_TIMEOUT, behavior.message);
                }
                InterruptReason::AutoModeDisabled => {}
            }
        }

        if behavior.action == InterruptAction::ResetAfterDelay {
            if let Some(delay) = behavior.delay {
                tokio::select! {
                    _ = self.lifetime.cancelled() => {
                        self.handling_interrupt.store(false, Ordering::SeqCst);
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            // 等待窗口内环境恢复则不再复位
            let recovered = match reason {
                InterruptReason::PlcConnectionLost => {
                    !self.active_errors.is_active(ERR_PLC_CONNECTION_LOST)
                }
                InterruptReason::TagTimeout => {
                    !self.active_errors.is_active(ERR_TAG_READ_TIMEOUT)
                }
                InterruptReason::AutoModeDisabled => false,
            };
            if !recovered {
                self.reset().await;
            }
        }

        self.handling_interrupt.store(false, Ordering::SeqCst);
    }

    /// 硬复位
    ///
    /// 放弃当前会话：停止执行、清空状态表格与锅炉会话、
    /// 清除全部错误码，最终状态为 Failed
    pub async fn reset(&self) {
        let _guard = self.op_lock.lock().await;
        warn!("[ErrorCoordinator] 执行硬复位，当前会话被放弃");

        self.coordinator
            .stop(ExecutionStopReason::PlcHardReset, "环境中断触发硬复位", true);
        self.interrupt_message.clear();
        self.pause_token.resume();
        self.state_manager.clear_errors();
        self.state_manager.transition_to(ExecutionState::Failed);
        self.status_reporter.clear_all();
        self.boiler_state.clear();
        self.active_errors.clear_all();
        self.events.emit(&ExecutionEvent::Reset);
    }

    /// 软停止
    ///
    /// 停止执行但保留扫码行与锅炉会话，最终状态为 Idle
    pub async fn force_stop(&self) {
        let _guard = self.op_lock.lock().await;
        info!("[ErrorCoordinator] 执行软停止");

        self.coordinator
            .stop(ExecutionStopReason::PlcSoftReset, "操作员软停止", false);
        self.interrupt_message.clear();
        self.pause_token.resume();
        self.state_manager.clear_errors();
        self.state_manager.transition_to(ExecutionState::Idle);
        self.status_reporter.clear_all_except_scan();
        self.active_errors.clear_all();
    }

    /// 环境恢复后尝试解除暂停
    pub async fn try_resume_from_pause(&self) {
        let _guard = self.op_lock.lock().await;
        if !self.pause_token.is_paused() {
            return;
        }
        info!("[ErrorCoordinator] 环境已恢复，解除暂停");
        self.interrupt_message.clear();
        self.active_errors.clear(ERR_PLC_CONNECTION_LOST);
        self.active_errors.clear(ERR_TAG_READ_TIMEOUT);
        self.pause_token.resume();
        self.events.emit(&ExecutionEvent::Recovered);
    }

    /// 是否有中断在处理中
    pub fn is_handling_interrupt(&self) -> bool {
        self.handling_interrupt.load(Ordering::SeqCst)
    }

    /// 关停协调器
    ///
    /// 触发生命周期令牌并在限定时间内等待在途中断处理结束
    pub async fn shutdown(&self, wait: Duration) {
        self.lifetime.cancel();
        let deadline = tokio::time::Instant::now() + wait;
        while self.is_handling_interrupt() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if self.is_handling_interrupt() {
            warn!("[ErrorCoordinator] 关停超时，仍有中断处理在进行");
        }
    }
}
