/// 集成测试公共设施

use async_trait::async_trait;
use final_test_bench::models::TestStepResult;
use final_test_bench::services::domain::TestStepContext;
use final_test_bench::services::infrastructure::MockDeviceService;
use final_test_bench::services::{ITestStep, ServiceContainer};
use final_test_bench::utils::config::AppConfig;
use final_test_bench::AppResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 按脚本返回结果的测试步骤
///
/// 依次弹出预设结果，耗尽后返回成功；记录执行次数
pub struct ScriptedStep {
    name: String,
    outcomes: Mutex<Vec<AppResult<TestStepResult>>>,
    executions: AtomicUsize,
    /// 每次执行前的可选等待（模拟长耗时设备操作）
    delay: Option<Duration>,
}

impl ScriptedStep {
    pub fn new(name: &str, outcomes: Vec<AppResult<TestStepResult>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            outcomes: Mutex::new(outcomes),
            executions: AtomicUsize::new(0),
            delay: None,
        })
    }

    pub fn always_ok(name: &str) -> Arc<Self> {
        Self::new(name, vec![])
    }

    pub fn fails_once(name: &str, message: &str) -> Arc<Self> {
        Self::new(name, vec![Ok(TestStepResult::failure(message))])
    }

    pub fn slow_ok(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            outcomes: Mutex::new(vec![]),
            executions: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ITestStep for ScriptedStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        ""
    }

    fn id(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        _context: &TestStepContext,
        ct: &CancellationToken,
    ) -> AppResult<TestStepResult> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = ct.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
        let mut outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        if outcomes.is_empty() {
            Ok(TestStepResult::success("OK"))
        } else {
            outcomes.remove(0)
        }
    }
}

/// 组装测试用的服务容器（Mock设备、短复位延迟）
pub fn make_container() -> (ServiceContainer, Arc<MockDeviceService>) {
    let mut config = AppConfig::default();
    config.interrupt_config.plc_reconnect_delay_ms = 50;
    let device = Arc::new(MockDeviceService::new_for_testing("TestBench"));
    let container = ServiceContainer::new(&config, device.clone());
    (container, device)
}

/// 轮询等待条件成立
pub async fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
