/// 标签写入步骤
///
/// 向设备写入一个标签值。写入失败（设备返回失败或通信异常）
/// 归一为步骤失败，由操作员通过重试/跳过解决

use crate::models::TestStepResult;
use crate::services::domain::TestStepContext;
use crate::services::traits::ITestStep;
use crate::utils::error::AppResult;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub struct WriteTagStep {
    id: String,
    name: String,
    description: String,
    address: String,
    value: Value,
}

impl WriteTagStep {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        value: Value,
    ) -> Self {
        let name = name.into();
        let address = address.into();
        Self {
            id: format!("write:{}", address),
            description: format!("写入标签 {}", address),
            name,
            address,
            value,
        }
    }
}

#[async_trait]
impl ITestStep for WriteTagStep {
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
        let result = context
            .device()
            .write_tag(&self.address, self.value.clone())
            .await?;
        if result.success {
            Ok(TestStepResult::success(format!(
                "已写入 {} = {}",
                self.address, self.value
            )))
        } else {
            Ok(TestStepResult::failure(format!(
                "写入 {} 失败: {}",
                self.address,
                result.error.unwrap_or_default()
            )))
        }
    }
}
