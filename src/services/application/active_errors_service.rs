/// 活动错误码服务
///
/// 维护当前处于激活状态的环境错误码集合（横幅展示用）。
/// 中断发生时挂起错误码，环境恢复或复位时清除

use crate::services::infrastructure::ListenerRegistry;
use std::collections::HashMap;
use std::sync::Mutex;

/// PLC连接丢失
pub const ERR_PLC_CONNECTION_LOST: &str = "ERR_PLC_CONNECTION_LOST";
/// 标签读取超时
pub const ERR_TAG_READ_TIMEOUT: &str = "ERR_TAG_READ_TIMEOUT";

pub struct ActiveErrorsService {
    active: Mutex<HashMap<String, String>>,
    on_changed: ListenerRegistry<()>,
}

impl ActiveErrorsService {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            on_changed: ListenerRegistry::new("ActiveErrorsService"),
        }
    }

    /// 挂起错误码（重复挂起只更新消息）
    pub fn raise(&self, code: &str, message: impl Into<String>) {
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.insert(code.to_string(), message.into());
        }
        self.on_changed.emit(&());
    }

    /// 清除错误码
    pub fn clear(&self, code: &str) {
        let removed = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.remove(code).is_some()
        };
        if removed {
            self.on_changed.emit(&());
        }
    }

    /// 清除全部错误码（复位）
    pub fn clear_all(&self) {
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if active.is_empty() {
                return;
            }
            active.clear();
        }
        self.on_changed.emit(&());
    }

    /// 错误码是否处于激活状态
    pub fn is_active(&self, code: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(code)
    }

    /// 当前激活的错误码列表
    pub fn active_codes(&self) -> Vec<String> {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// 变化事件注册表
    pub fn on_changed(&self) -> &ListenerRegistry<()> {
        &self.on_changed
    }
}

impl Default for ActiveErrorsService {
    fn default() -> Self {
        Self::new()
    }
}
