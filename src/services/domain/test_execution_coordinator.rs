/// 测试执行协调器
///
/// 驱动4列并行执行一组测试地图。地图之间是硬屏障：
/// 同一地图内各列独立推进互不干扰，地图结束后统一收集失败，
/// 进入暂停回合等待操作员决策（重试/跳过），全部解决后才进入下一张地图。
///
/// 操作员决策通过一次性单槽会合通道送达：每个暂停回合创建一个
/// oneshot 通道，重复或迟到的决策因找不到待处理通道而被丢弃

use crate::models::enums::{ErrorResolution, ExecutionState, ExecutionStopReason};
use crate::models::structs::{ExecutionEvent, StepError};
use crate::services::domain::activity_tracker::ExecutionActivityTracker;
use crate::services::domain::column_executor::ColumnExecutor;
use crate::services::domain::execution_flow_state::ExecutionFlowState;
use crate::services::domain::execution_state_manager::ExecutionStateManager;
use crate::services::domain::pause_token::PauseTokenSource;
use crate::services::domain::test_map::{TestMap, COLUMN_COUNT};
use crate::services::infrastructure::ListenerRegistry;
use crate::services::traits::ITestRunLogger;
use crate::utils::error::{AppError, AppResult};
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct CoordinatorInner {
    maps: Vec<Arc<TestMap>>,
    /// 本轮执行的取消令牌（每轮一个，不复用）
    cancel: Option<CancellationToken>,
    /// 当前暂停回合的决策会合通道（单槽）
    pending_resolution: Option<oneshot::Sender<ErrorResolution>>,
}

pub struct TestExecutionCoordinator {
    executors: [Arc<ColumnExecutor>; COLUMN_COUNT],
    inner: Mutex<CoordinatorInner>,
    current_map_index: AtomicUsize,
    state_manager: Arc<ExecutionStateManager>,
    flow_state: Arc<ExecutionFlowState>,
    pause_token: PauseTokenSource,
    activity_tracker: Arc<ExecutionActivityTracker>,
    events: Arc<ListenerRegistry<ExecutionEvent>>,
    run_logger: Arc<dyn ITestRunLogger>,
}

impl TestExecutionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executors: [Arc<ColumnExecutor>; COLUMN_COUNT],
        state_manager: Arc<ExecutionStateManager>,
        flow_state: Arc<ExecutionFlowState>,
        pause_token: PauseTokenSource,
        activity_tracker: Arc<ExecutionActivityTracker>,
        events: Arc<ListenerRegistry<ExecutionEvent>>,
        run_logger: Arc<dyn ITestRunLogger>,
    ) -> Self {
        Self {
            executors,
            inner: Mutex::new(CoordinatorInner {
                maps: Vec::new(),
                cancel: None,
                pending_resolution: None,
            }),
            current_map_index: AtomicUsize::new(0),
            state_manager,
            flow_state,
            pause_token,
            activity_tracker,
            events,
            run_logger,
        }
    }

    /// 装载测试地图序列
    ///
    /// 本轮执行期间（含暂停回合）拒绝更换；装载时复位全部列执行器
    pub fn set_maps(&self, maps: Vec<Arc<TestMap>>) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // 取消令牌的存在贯穿整轮执行，PausedOnError 期间同样在内
        if inner.cancel.is_some() || self.state_manager.is_active() {
            warn!("[Coordinator] 测试执行期间拒绝更换测试地图");
            return Err(AppError::business_logic_error(
                "测试执行期间不能更换测试地图",
            ));
        }
        for executor in &self.executors {
            executor.reset();
        }
        self.current_map_index.store(0, Ordering::SeqCst);
        inner.maps = maps;
        Ok(())
    }

    /// 启动测试序列并执行到结束
    ///
    /// 单飞：已有活动执行时返回错误。函数返回即本轮结束
    /// （Completed/Failed 均已结算，取消令牌已清理）
    pub async fn start(&self) -> AppResult<()> {
        let (ct, total_maps) = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.cancel.is_some() || self.state_manager.is_active() {
                return Err(AppError::business_logic_error("测试序列已在执行中"));
            }
            if inner.maps.is_empty() {
                return Err(AppError::validation_error("未装载测试地图"));
            }
            let ct = CancellationToken::new();
            inner.cancel = Some(ct.clone());
            (ct, inner.maps.len())
        };

        info!("[Coordinator] 🚀 测试序列启动，共{}张地图", total_maps);
        self.run_logger.log_information("测试序列启动");
        self.flow_state.clear_stop();
        self.state_manager.clear_errors();
        self.state_manager.reset_error_tracking();
        self.activity_tracker.set_test_execution_active(true);
        self.current_map_index.store(0, Ordering::SeqCst);
        self.state_manager.transition_to(ExecutionState::Running);

        for map_index in 0..total_maps {
            if ct.is_cancelled() {
                break;
            }
            self.current_map_index.store(map_index, Ordering::SeqCst);
            let map = {
                let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                match inner.maps.get(map_index) {
                    Some(map) => map.clone(),
                    None => break,
                }
            };

            debug!("[Coordinator] 执行地图 {}/{}", map_index + 1, total_maps);
            let runs = self
                .executors
                .iter()
                .map(|executor| {
                    let executor = executor.clone();
                    let map = map.clone();
                    let ct = ct.clone();
                    async move { executor.execute_map(&map, &ct).await }
                })
                .collect::<Vec<_>>();
            futures::future::join_all(runs).await;

            // 地图屏障：失败全部解决后才进入下一张
            self.resolve_failures(&ct).await;

            if ct.is_cancelled() || self.any_column_failed() {
                break;
            }
        }

        self.complete();
        Ok(())
    }

    /// 失败解决循环（地图屏障）
    ///
    /// 每轮重新收集失败列；暂停回合内只上报一个代表错误
    /// （列索引最小者），其余并发失败被静默吸收
    async fn resolve_failures(&self, ct: &CancellationToken) {
        loop {
            let failed_columns = self.failed_columns();
            if failed_columns.is_empty() {
                if self.state_manager.state() == ExecutionState::PausedOnError {
                    self.state_manager.transition_to(ExecutionState::Running);
                }
                return;
            }
            if ct.is_cancelled() {
                return;
            }

            for &column_index in &failed_columns {
                self.state_manager
                    .enqueue_error(self.step_error_for(column_index));
            }

            // 会合通道先于 PausedOnError 可见，决策到达时必有接收方
            let receiver = {
                let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                let (tx, rx) = oneshot::channel();
                if inner.pending_resolution.replace(tx).is_some() {
                    debug!("[Coordinator] 上一回合的决策通道被替换");
                }
                rx
            };

            if self.state_manager.state() != ExecutionState::PausedOnError {
                self.state_manager
                    .transition_to(ExecutionState::PausedOnError);
                if let Some(error) = self.state_manager.current_error() {
                    self.run_logger.log_warning(&format!(
                        "列{}步骤失败，等待操作员决策: {}",
                        error.column_index + 1,
                        error.error_message
                    ));
                    self.events.emit(&ExecutionEvent::ErrorOccurred(error));
                }
            }

            let resolution = tokio::select! {
                _ = ct.cancelled() => None,
                result = receiver => result.ok(),
            };

            match resolution {
                Some(ErrorResolution::Retry) => {
                    info!("[Coordinator] 操作员选择重试");
                    self.events.emit(&ExecutionEvent::RetryStarted);
                    let retries = failed_columns
                        .iter()
                        .map(|&column_index| {
                            let executor = self.executors[column_index].clone();
                            let ct = ct.clone();
                            async move { executor.retry_last_failed_step(&ct).await }
                        })
                        .collect::<Vec<_>>();
                    futures::future::join_all(retries).await;

                    for &column_index in &failed_columns {
                        if !self.executors[column_index].has_failed() {
                            self.state_manager.remove_error_for_column(column_index);
                        }
                    }
                }
                Some(ErrorResolution::Skip) => {
                    info!("[Coordinator] 操作员选择跳过");
                    for &column_index in &failed_columns {
                        self.executors[column_index].clear_failed_state();
                    }
                    self.state_manager.mark_error_skipped();
                    self.state_manager.clear_errors();
                    self.state_manager.transition_to(ExecutionState::Running);
                    return;
                }
                Some(ErrorResolution::None) | None => {
                    if ct.is_cancelled() {
                        return;
                    }
                    // 决策通道被丢弃（复位等），重新进入等待
                }
            }
        }
    }

    /// 送达操作员的错误决策
    ///
    /// 无待处理回合时丢弃（重复点击、迟到的决策）
    pub fn handle_error_resolution(&self, resolution: ErrorResolution) {
        let sender = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.pending_resolution.take()
        };
        match sender {
            Some(sender) => {
                if sender.send(resolution).is_err() {
                    debug!("[Coordinator] 决策接收方已退出，决策被丢弃");
                }
            }
            None => {
                debug!("[Coordinator] 无待处理的错误决策，忽略: {:?}", resolution);
            }
        }
    }

    /// 请求停止本轮执行
    ///
    /// 锁存停止原因并触发取消令牌；取消本身不计为失败，
    /// 是否按失败结算由 `stop_as_failure` 决定
    pub fn stop(&self, reason: ExecutionStopReason, description: &str, stop_as_failure: bool) {
        self.flow_state.request_stop(reason, stop_as_failure);
        let cancel = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.cancel.clone()
        };
        if let Some(cancel) = cancel {
            if !cancel.is_cancelled() {
                info!("[Coordinator] 停止执行 ({:?}): {}", reason, description);
                self.run_logger
                    .log_warning(&format!("执行停止: {}", description));
                cancel.cancel();
            }
        }
    }

    /// 结算本轮执行
    fn complete(&self) {
        let flow = self.flow_state.snapshot();
        let success = !(self.state_manager.state() == ExecutionState::Failed
            || self.any_column_failed()
            || flow.stop_as_failure);

        let final_state = if success {
            ExecutionState::Completed
        } else {
            ExecutionState::Failed
        };
        self.state_manager.transition_to(final_state);
        self.activity_tracker.set_test_execution_active(false);

        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.cancel = None;
            inner.pending_resolution = None;
        }

        if success {
            info!("[Coordinator] ✅ 测试序列完成");
            self.run_logger.log_information("测试序列完成");
        } else {
            warn!("[Coordinator] ❌ 测试序列以失败结束 ({:?})", flow.reason);
            self.run_logger.log_error("测试序列以失败结束");
        }
        self.events
            .emit(&ExecutionEvent::SequenceCompleted { success });
    }

    fn failed_columns(&self) -> Vec<usize> {
        (0..COLUMN_COUNT)
            .filter(|&i| self.executors[i].has_failed())
            .collect()
    }

    fn any_column_failed(&self) -> bool {
        self.executors.iter().any(|e| e.has_failed())
    }

    fn step_error_for(&self, column_index: usize) -> StepError {
        let snapshot = self.executors[column_index].snapshot();
        StepError {
            column_index,
            step_name: snapshot.name.clone(),
            step_description: snapshot.description.clone(),
            error_message: snapshot.error_message.clone().unwrap_or_default(),
            timestamp: Utc::now(),
            correlation_id: snapshot.correlation_id.unwrap_or_else(Uuid::nil),
        }
    }

    /// 当前地图索引
    pub fn current_map_index(&self) -> usize {
        self.current_map_index.load(Ordering::SeqCst)
    }

    /// 装载的地图总数
    pub fn total_maps(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .maps
            .len()
    }

    /// 是否有执行在进行（从启动到结算，含暂停回合）
    pub fn is_running(&self) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.cancel.is_some() || self.state_manager.is_active()
    }

    /// 是否存在失败锁存的列
    pub fn has_errors(&self) -> bool {
        self.any_column_failed()
    }

    /// 列执行器
    pub fn executors(&self) -> &[Arc<ColumnExecutor>; COLUMN_COUNT] {
        &self.executors
    }

    /// 暂停令牌
    pub fn pause_token(&self) -> &PauseTokenSource {
        &self.pause_token
    }

    /// 事件注册表
    pub fn events(&self) -> &Arc<ListenerRegistry<ExecutionEvent>> {
        &self.events
    }
}
