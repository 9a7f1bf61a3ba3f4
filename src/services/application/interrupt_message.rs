/// 中断提示消息状态
///
/// 持有面向操作员的当前中断提示（"PLC连接丢失，等待恢复…"等）。
/// 非空表示界面应展示阻断性横幅

use crate::services::infrastructure::ListenerRegistry;
use std::sync::Mutex;

pub struct InterruptMessageState {
    message: Mutex<Option<String>>,
    on_changed: ListenerRegistry<Option<String>>,
}

impl InterruptMessageState {
    pub fn new() -> Self {
        Self {
            message: Mutex::new(None),
            on_changed: ListenerRegistry::new("InterruptMessageState"),
        }
    }

    /// 设置中断提示
    pub fn set_message(&self, message: impl Into<String>) {
        let message = Some(message.into());
        {
            let mut current = self.message.lock().unwrap_or_else(|e| e.into_inner());
            if *current == message {
                return;
            }
            *current = message.clone();
        }
        self.on_changed.emit(&message);
    }

    /// 清除中断提示
    pub fn clear(&self) {
        {
            let mut current = self.message.lock().unwrap_or_else(|e| e.into_inner());
            if current.is_none() {
                return;
            }
            *current = None;
        }
        self.on_changed.emit(&None);
    }

    /// 当前提示
    pub fn current(&self) -> Option<String> {
        self.message.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 变化事件注册表
    pub fn on_changed(&self) -> &ListenerRegistry<Option<String>> {
        &self.on_changed
    }
}

impl Default for InterruptMessageState {
    fn default() -> Self {
        Self::new()
    }
}
