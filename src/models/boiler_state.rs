use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// 当前被测锅炉的会话数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoilerSession {
    /// 序列号（扫码获得）
    pub serial_number: Option<String>,
    /// 产品型号
    pub article: Option<String>,
    /// 测试开始时间
    pub test_start_time: Option<DateTime<Utc>>,
    /// 上一台锅炉的序列号
    pub last_serial_number: Option<String>,
    /// 上一次测试完成时间
    pub last_test_completed_at: Option<DateTime<Utc>>,
}

/// 锅炉会话状态
///
/// 仅硬复位（Reset）会清空此数据；软停止（ForceStop）保留。
/// 读取方拿到的是完整快照，写入方整体替换
pub struct BoilerState {
    session: Mutex<BoilerSession>,
}

impl BoilerState {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(BoilerSession::default()),
        }
    }

    /// 获取会话快照
    pub fn snapshot(&self) -> BoilerSession {
        self.session.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 开始新的会话（扫码成功后调用）
    pub fn begin_session(&self, serial_number: impl Into<String>, article: impl Into<String>) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        session.serial_number = Some(serial_number.into());
        session.article = Some(article.into());
        session.test_start_time = Some(Utc::now());
    }

    /// 标记测试完成（保留序列号用于下一台的防重检查）
    pub fn complete_session(&self) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        session.last_serial_number = session.serial_number.take();
        session.last_test_completed_at = Some(Utc::now());
        session.article = None;
        session.test_start_time = None;
    }

    /// 是否存在有效会话
    pub fn has_session(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .serial_number
            .is_some()
    }

    /// 清空全部会话数据（仅硬复位路径调用）
    pub fn clear(&self) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *session = BoilerSession::default();
    }
}

impl Default for BoilerState {
    fn default() -> Self {
        Self::new()
    }
}
