/// 延时步骤
///
/// 使用上下文的可暂停分段延时，长等待期间仍能响应暂停与取消

use crate::models::TestStepResult;
use crate::services::domain::TestStepContext;
use crate::services::traits::ITestStep;
use crate::utils::error::AppResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct DelayStep {
    id: String,
    name: String,
    description: String,
    duration: Duration,
}

impl DelayStep {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: format!("delay:{}ms", duration.as_millis()),
            description: format!("等待 {}ms", duration.as_millis()),
            name: name.into(),
            duration,
        }
    }
}

#[async_trait]
impl ITestStep for DelayStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(
        &self,
        context: &TestStepContext,
        ct: &CancellationToken,
    ) -> AppResult<TestStepResult> {
        context.delay(self.duration, ct).await;
        Ok(TestStepResult::success(""))
    }
}
