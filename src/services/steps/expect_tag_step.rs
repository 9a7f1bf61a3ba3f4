/// 标签期望值校验步骤
///
/// 读取标签并与期望值比较，不一致时以步骤失败上报
/// （消息中带实际值，便于操作员判断重试还是跳过）

use crate::models::TestStepResult;
use crate::services::domain::TestStepContext;
use crate::services::traits::ITestStep;
use crate::utils::error::AppResult;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub struct ExpectTagStep {
    id: String,
    name: String,
    description: String,
    address: String,
    expected: Value,
}

impl ExpectTagStep {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        expected: Value,
    ) -> Self {
        let name = name.into();
        let address = address.into();
        Self {
            id: format!("expect:{}", address),
            description: format!("校验标签 {}", address),
            name,
            address,
            expected,
        }
    }
}

#[async_trait]
impl ITestStep for ExpectTagStep {
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
        _ct: &CancellationToken,
    ) -> AppResult<TestStepResult> {
        let result = context.device().read_tag(&self.address).await?;
        if !result.success {
            return Ok(TestStepResult::failure(format!(
                "读取 {} 失败: {}",
                self.address,
                result.error.unwrap_or_default()
            )));
        }

        let actual = result.value.unwrap_or(Value::Null);
        if actual == self.expected {
            Ok(TestStepResult::success(format!(
                "{} = {}",
                self.address, actual
            )))
        } else {
            Ok(TestStepResult::failure(format!(
                "{} 期望 {} 实际 {}",
                self.address, self.expected, actual
            )))
        }
    }
}
