/// 测试列执行器
///
/// 每列一个实例，顺序执行地图中属于本列的步骤。
/// 失败以列内状态记录（has_failed 锁存，失败步骤实例保留用于原位重试），
/// 绝不向协调器抛异常；取消只产生干净停止，不计为失败

use crate::models::enums::StepDisplayStatus;
use crate::models::structs::TestStepResult;
use crate::services::application::StepStatusReporter;
use crate::services::domain::pause_token::PauseTokenSource;
use crate::services::domain::step_context::TestStepContext;
use crate::services::domain::test_map::TestMap;
use crate::services::infrastructure::ListenerRegistry;
use crate::services::traits::{ITestRunLogger, ITestStep};
use log::{debug, error, info};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 列的当前步骤状态快照
///
/// 整体替换而非就地修改：读取方拿到的 Arc 永远是一致的完整记录
#[derive(Clone)]
pub struct StepState {
    /// 当前（或最后执行的）步骤名称
    pub name: String,
    /// 步骤描述
    pub description: String,
    /// 展示状态（None 表示本列空闲）
    pub status: Option<StepDisplayStatus>,
    /// 最近一次失败的错误消息（清除失败后保留，供追溯）
    pub error_message: Option<String>,
    /// 最近一次成功的结果值
    pub result_value: Option<String>,
    /// 失败锁存标志
    pub has_failed: bool,
    /// 状态表格行的关联ID
    pub correlation_id: Option<Uuid>,
    /// 失败的步骤实例（原位重试用同一实例）
    pub failed_step: Option<Arc<dyn ITestStep>>,
}

impl StepState {
    /// 空闲状态
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            status: None,
            error_message: None,
            result_value: None,
            has_failed: false,
            correlation_id: None,
            failed_step: None,
        }
    }
}

pub struct ColumnExecutor {
    column_index: usize,
    context: Arc<TestStepContext>,
    pause_token: PauseTokenSource,
    status_reporter: Arc<StepStatusReporter>,
    run_logger: Arc<dyn ITestRunLogger>,
    state: Mutex<Arc<StepState>>,
    /// 状态快照更换后广播本列索引
    on_state_changed: ListenerRegistry<usize>,
}

impl ColumnExecutor {
    pub fn new(
        column_index: usize,
        context: Arc<TestStepContext>,
        pause_token: PauseTokenSource,
        status_reporter: Arc<StepStatusReporter>,
        run_logger: Arc<dyn ITestRunLogger>,
    ) -> Self {
        Self {
            column_index,
            context,
            pause_token,
            status_reporter,
            run_logger,
            state: Mutex::new(Arc::new(StepState::empty())),
            on_state_changed: ListenerRegistry::new("ColumnExecutor"),
        }
    }

    /// 所属列索引
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> Arc<StepState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 本列是否处于失败锁存状态
    pub fn has_failed(&self) -> bool {
        self.snapshot().has_failed
    }

    /// 状态变化事件注册表
    pub fn on_state_changed(&self) -> &ListenerRegistry<usize> {
        &self.on_state_changed
    }

    /// 整体替换状态快照并广播
    fn swap_state(&self, build: impl FnOnce(&StepState) -> StepState) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let next = build(state.as_ref());
            *state = Arc::new(next);
        }
        self.on_state_changed.emit(&self.column_index);
    }

    /// 执行一张地图中属于本列的全部步骤
    ///
    /// 本列失败后锁存并提前返回（等待操作员决策）；
    /// 取消令牌触发时干净退出，不改写失败状态
    pub async fn execute_map(&self, map: &TestMap, ct: &CancellationToken) {
        for row in map.rows() {
            if ct.is_cancelled() || self.has_failed() {
                break;
            }

            let step = match &row.steps[self.column_index] {
                Some(step) => step.clone(),
                None => continue,
            };

            self.pause_token.wait_while_paused(ct).await;
            if ct.is_cancelled() {
                break;
            }

            self.execute_step(step, ct).await;
        }

        self.clear_status_if_not_failed();
    }

    /// 执行单个步骤
    async fn execute_step(&self, step: Arc<dyn ITestStep>, ct: &CancellationToken) {
        let correlation_id = self.status_reporter.report_step_started(step.as_ref());
        self.swap_state(|_| StepState {
            name: step.name().to_string(),
            description: step.description().to_string(),
            status: Some(StepDisplayStatus::Running),
            error_message: None,
            result_value: None,
            has_failed: false,
            correlation_id: Some(correlation_id),
            failed_step: None,
        });
        self.run_logger.log_step_start(step.name());
        debug!("[列{}] ▶ 步骤开始: {}", self.column_index, step.name());

        match step.execute(&self.context, ct).await {
            Ok(result) => self.process_step_result(step, result, correlation_id),
            Err(e) if ct.is_cancelled() => {
                // 取消过程中的异常视为干净停止
                debug!("[列{}] 步骤在取消中退出: {}", self.column_index, e);
                self.clear_status_if_not_failed();
            }
            Err(e) => {
                self.set_error_state(step, e.to_string(), correlation_id);
            }
        }
    }

    /// 归一化步骤的业务级结果
    fn process_step_result(
        &self,
        step: Arc<dyn ITestStep>,
        result: TestStepResult,
        correlation_id: Uuid,
    ) {
        if result.success {
            let status = if result.skipped {
                StepDisplayStatus::Skipped
            } else {
                StepDisplayStatus::Done
            };
            self.swap_state(|current| StepState {
                status: Some(status),
                result_value: Some(result.message.clone()),
                ..current.clone()
            });
            self.status_reporter.report_success(correlation_id, &result.message);
            self.run_logger.log_step_end(step.name());
            if !result.message.is_empty() {
                self.run_logger.log_information(&result.message);
            }
            debug!("[列{}] ✔ 步骤完成: {}", self.column_index, step.name());
        } else {
            self.set_error_state(step, result.message, correlation_id);
        }
    }

    /// 进入失败锁存状态
    fn set_error_state(&self, step: Arc<dyn ITestStep>, message: String, correlation_id: Uuid) {
        self.swap_state(|current| StepState {
            status: Some(StepDisplayStatus::Error),
            error_message: Some(message.clone()),
            has_failed: true,
            failed_step: Some(step.clone()),
            correlation_id: Some(correlation_id),
            ..current.clone()
        });
        self.status_reporter.report_error(correlation_id, &message);
        self.run_logger
            .log_error(&format!("步骤失败 [{}]: {}", step.name(), message));
        error!(
            "[列{}] ❌ 步骤失败: {} - {}",
            self.column_index,
            step.name(),
            message
        );
    }

    /// 原位重试最后失败的步骤（同一实例、同一表格行）
    pub async fn retry_last_failed_step(&self, ct: &CancellationToken) {
        let (step, correlation_id) = {
            let snapshot = self.snapshot();
            match (&snapshot.failed_step, snapshot.correlation_id) {
                (Some(step), Some(id)) => (step.clone(), id),
                _ => return,
            }
        };

        self.status_reporter.report_retry(correlation_id);
        self.swap_state(|current| StepState {
            status: Some(StepDisplayStatus::Retrying),
            has_failed: false,
            failed_step: None,
            ..current.clone()
        });
        self.run_logger
            .log_information(&format!("重试步骤: {}", step.name()));
        info!("[列{}] 重试步骤: {}", self.column_index, step.name());

        match step.execute(&self.context, ct).await {
            Ok(result) => self.process_step_result(step, result, correlation_id),
            Err(_) if ct.is_cancelled() => {
                self.clear_status_if_not_failed();
            }
            Err(e) => {
                self.set_error_state(step, e.to_string(), correlation_id);
            }
        }
    }

    /// 解除失败锁存（跳过决策）
    ///
    /// 错误消息保留供追溯；状态表格的错误行不改写
    pub fn clear_failed_state(&self) {
        let correlation_id = {
            let snapshot = self.snapshot();
            if !snapshot.has_failed {
                return;
            }
            snapshot.correlation_id
        };
        self.swap_state(|current| StepState {
            status: None,
            has_failed: false,
            failed_step: None,
            ..current.clone()
        });
        if let Some(id) = correlation_id {
            self.status_reporter.report_skipped(id);
        }
        self.run_logger.log_warning("操作员选择跳过失败步骤");
        info!("[列{}] 失败步骤已跳过", self.column_index);
    }

    /// 地图结束后清除展示状态（失败锁存时保留）
    fn clear_status_if_not_failed(&self) {
        if self.has_failed() {
            return;
        }
        let needs_clear = self.snapshot().status.is_some();
        if needs_clear {
            self.swap_state(|current| StepState {
                status: None,
                ..current.clone()
            });
        }
    }

    /// 复位本列（清空状态与列内变量）
    pub fn reset(&self) {
        self.swap_state(|_| StepState::empty());
        self.context.clear_variables();
    }
}
