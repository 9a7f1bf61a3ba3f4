/// 测试序列状态表格服务
///
/// 维护操作员界面展示的步骤状态行。每行记录步骤名称、当前状态与消息，
/// 行以UUID关联（步骤开始时创建，后续状态更新按ID定位）

use crate::models::enums::StepDisplayStatus;
use crate::services::infrastructure::ListenerRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// 状态表格中的一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: StepDisplayStatus,
    pub message: String,
    /// 扫码/会话准备行在软复位时保留
    pub is_scan_step: bool,
}

pub struct TestSequenseService {
    rows: Mutex<Vec<SequenceRow>>,
    on_changed: ListenerRegistry<()>,
}

impl TestSequenseService {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            on_changed: ListenerRegistry::new("TestSequenseService"),
        }
    }

    /// 新增一行（状态为运行中），返回行ID
    pub fn add_step(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        is_scan_step: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        {
            let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
            rows.push(SequenceRow {
                id,
                name: name.into(),
                description: description.into(),
                status: StepDisplayStatus::Running,
                message: String::new(),
                is_scan_step,
            });
        }
        self.on_changed.emit(&());
        id
    }

    /// 将行标记为运行中（重试时复用原行）
    pub fn set_running(&self, id: Uuid) {
        self.update_row(id, StepDisplayStatus::Running, None);
    }

    /// 将行标记为成功
    pub fn set_success(&self, id: Uuid, message: impl Into<String>) {
        self.update_row(id, StepDisplayStatus::Done, Some(message.into()));
    }

    /// 将行标记为重试中
    pub fn set_retrying(&self, id: Uuid) {
        self.update_row(id, StepDisplayStatus::Retrying, None);
    }

    /// 将行标记为错误
    pub fn set_error(&self, id: Uuid, message: impl Into<String>) {
        self.update_row(id, StepDisplayStatus::Error, Some(message.into()));
    }

    fn update_row(&self, id: Uuid, status: StepDisplayStatus, message: Option<String>) {
        let updated = {
            let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
            match rows.iter_mut().find(|row| row.id == id) {
                Some(row) => {
                    row.status = status;
                    if let Some(message) = message {
                        row.message = message;
                    }
                    true
                }
                None => false,
            }
        };
        if updated {
            self.on_changed.emit(&());
        }
    }

    /// 清空全部行（硬复位）
    pub fn clear_all(&self) {
        {
            let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
            rows.clear();
        }
        self.on_changed.emit(&());
    }

    /// 清空除扫码行之外的全部行（软复位保留会话准备记录）
    pub fn clear_all_except_scan(&self) {
        {
            let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
            rows.retain(|row| row.is_scan_step);
        }
        self.on_changed.emit(&());
    }

    /// 当前行快照
    pub fn rows(&self) -> Vec<SequenceRow> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 变化事件注册表
    pub fn on_changed(&self) -> &ListenerRegistry<()> {
        &self.on_changed
    }
}

impl Default for TestSequenseService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 行的创建与状态更新
    #[test]
    fn test_add_and_update_rows() {
        let service = TestSequenseService::new();
        let id = service.add_step("写入压力", "", false);

        service.set_success(id, "OK");
        let rows = service.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, StepDisplayStatus::Done);
        assert_eq!(rows[0].message, "OK");
    }

    /// 软复位保留扫码行
    #[test]
    fn test_clear_all_except_scan() {
        let service = TestSequenseService::new();
        service.add_step("扫码", "", true);
        service.add_step("写入压力", "", false);

        service.clear_all_except_scan();
        let rows = service.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_scan_step);

        service.clear_all();
        assert!(service.rows().is_empty());
    }
}
