/// 事件监听器注册表
///
/// 显式的订阅者列表，逐个回调并相互隔离：
/// 单个监听器的panic只会被记录，不会中断其它监听器或发布方

use log::error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// 订阅句柄，用于退订
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;

/// 泛型监听器注册表
pub struct ListenerRegistry<E> {
    /// 注册表名称（仅用于日志）
    name: &'static str,
    listeners: Mutex<Vec<(SubscriptionId, Listener<E>)>>,
    next_id: AtomicU64,
}

impl<E> ListenerRegistry<E> {
    /// 创建新的注册表
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 订阅事件
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.push((id, Box::new(listener)));
        id
    }

    /// 退订事件
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    /// 当前订阅者数量
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 向所有订阅者发布事件
    ///
    /// 回调在调用方线程同步执行；不持锁跨回调之外的任何代码
    pub fn emit(&self, event: &E) {
        // 先复制出回调引用再释放锁会引入生命周期问题，这里在锁内迭代，
        // 监听器回调不允许再反向调用本注册表的订阅接口
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for (id, listener) in listeners.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| listener(event)));
            if result.is_err() {
                error!("[{}] 监听器 {:?} 执行时发生panic，已隔离", self.name, id);
            }
        }
    }
}
