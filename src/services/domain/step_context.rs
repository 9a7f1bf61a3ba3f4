/// 测试步骤执行上下文
///
/// 每列一个实例，贯穿整轮测试。向步骤提供设备访问、
/// 列内共享变量与可暂停的延时原语

use crate::services::traits::IDeviceService;
use crate::services::domain::pause_token::PauseTokenSource;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct TestStepContext {
    column_index: usize,
    device: Arc<dyn IDeviceService>,
    pause_token: PauseTokenSource,
    /// 列内步骤间传递的命名变量（测量值、标定系数等）
    variables: Mutex<HashMap<String, Value>>,
}

impl TestStepContext {
    pub fn new(
        column_index: usize,
        device: Arc<dyn IDeviceService>,
        pause_token: PauseTokenSource,
    ) -> Self {
        Self {
            column_index,
            device,
            pause_token,
            variables: Mutex::new(HashMap::new()),
        }
    }

    /// 所属测试列索引（0..3）
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    /// 设备通信服务
    pub fn device(&self) -> &Arc<dyn IDeviceService> {
        &self.device
    }

    /// 写入列内变量
    pub fn set_variable(&self, name: impl Into<String>, value: Value) {
        self.variables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value);
    }

    /// 读取列内变量
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// 清空列内变量（复位时调用）
    pub fn clear_variables(&self) {
        self.variables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// 可暂停的分段延时
    ///
    /// 按100ms分片等待，片间检查暂停闸门与取消令牌，
    /// 使长延时步骤也能及时响应环境中断
    pub async fn delay(&self, duration: Duration, ct: &CancellationToken) {
        const CHUNK: Duration = Duration::from_millis(100);

        let mut remaining = duration;
        while remaining > Duration::ZERO && !ct.is_cancelled() {
            self.pause_token.wait_while_paused(ct).await;
            if ct.is_cancelled() {
                return;
            }
            let slice = remaining.min(CHUNK);
            tokio::select! {
                _ = ct.cancelled() => return,
                _ = tokio::time::sleep(slice) => {}
            }
            remaining = remaining.saturating_sub(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::infrastructure::MockDeviceService;

    fn make_context() -> TestStepContext {
        TestStepContext::new(
            0,
            Arc::new(MockDeviceService::new_for_testing("TestDevice")),
            PauseTokenSource::new(),
        )
    }

    /// 变量的写入、读取与清空
    #[test]
    fn test_variables_roundtrip() {
        let context = make_context();
        context.set_variable("压力", Value::from(1.25));
        assert_eq!(context.get_variable("压力"), Some(Value::from(1.25)));

        context.clear_variables();
        assert_eq!(context.get_variable("压力"), None);
    }

    /// 取消令牌让延时提前返回
    #[tokio::test]
    async fn test_delay_aborts_on_cancellation() {
        let context = make_context();
        let ct = CancellationToken::new();
        ct.cancel();

        tokio::time::timeout(
            Duration::from_millis(50),
            context.delay(Duration::from_secs(10), &ct),
        )
        .await
        .unwrap();
    }
}
