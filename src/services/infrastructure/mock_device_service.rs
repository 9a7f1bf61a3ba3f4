/// Mock 设备服务实现
/// 用于开发和测试阶段，模拟真实的测试台PLC通信行为

use crate::models::DeviceIoResult;
use crate::services::traits::IDeviceService;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// 写入操作记录
/// 用于测试验证写入操作是否按预期执行
#[derive(Debug, Clone)]
pub struct WriteOperation {
    /// 写入时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// 写入地址
    pub address: String,
    /// 写入的值
    pub value: Value,
}

/// Mock 设备服务实现
/// 提供完整的设备读写接口模拟，支持预设值、写入记录和故障注入
pub struct MockDeviceService {
    /// 服务名称
    service_name: String,
    /// 连接状态
    connected: AtomicBool,
    /// 内部数据存储（地址 -> 值）
    data_storage: Arc<Mutex<HashMap<String, Value>>>,
    /// 写入操作记录（用于测试验证）
    write_log: Arc<Mutex<Vec<WriteOperation>>>,
    /// 是否模拟网络延迟
    simulate_network_delay: bool,
    /// 网络延迟时间（毫秒）
    network_delay_ms: u64,
    /// 是否模拟随机错误
    simulate_errors: bool,
    /// 错误率（0.0-1.0）
    error_rate: f64,
    /// 强制失败的地址集合（读写该地址必定失败）
    failing_addresses: Arc<Mutex<HashMap<String, String>>>,
}

impl MockDeviceService {
    /// 创建新的 Mock 设备服务实例
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            connected: AtomicBool::new(true),
            data_storage: Arc::new(Mutex::new(HashMap::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            simulate_network_delay: true,
            network_delay_ms: 50,
            simulate_errors: false,
            error_rate: 0.01, // 1% 错误率
            failing_addresses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 创建用于测试的 Mock 设备服务实例
    /// 禁用网络延迟和随机错误模拟，以便快速测试
    pub fn new_for_testing(service_name: impl Into<String>) -> Self {
        let mut service = Self::new(service_name);
        service.simulate_network_delay = false;
        service.simulate_errors = false;
        service
    }

    /// 预设读取值
    pub fn preset_value(&self, address: impl Into<String>, value: Value) {
        let mut storage = self.data_storage.lock().unwrap_or_else(|e| e.into_inner());
        storage.insert(address.into(), value);
    }

    /// 让指定地址的读写必定失败
    pub fn fail_address(&self, address: impl Into<String>, error: impl Into<String>) {
        let mut failing = self.failing_addresses.lock().unwrap_or_else(|e| e.into_inner());
        failing.insert(address.into(), error.into());
    }

    /// 恢复指定地址的正常读写
    pub fn clear_failure(&self, address: &str) {
        let mut failing = self.failing_addresses.lock().unwrap_or_else(|e| e.into_inner());
        failing.remove(address);
    }

    /// 设置连接状态（模拟断线/恢复）
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// 获取写入记录
    pub fn write_log(&self) -> Vec<WriteOperation> {
        self.write_log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 指定地址是否被写入过
    pub fn was_address_written(&self, address: &str) -> bool {
        self.write_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|op| op.address == address)
    }

    /// 获取最后一次写入记录
    pub fn get_last_write(&self) -> Option<WriteOperation> {
        self.write_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// 模拟网络延迟与随机错误
    async fn simulate_io(&self, operation: &str, address: &str) -> AppResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AppError::plc_communication_error(format!(
                "[{}] 设备未连接: {} {}",
                self.service_name, operation, address
            )));
        }

        if self.simulate_network_delay {
            sleep(Duration::from_millis(self.network_delay_ms)).await;
        }

        if self.simulate_errors && rand::random::<f64>() < self.error_rate {
            return Err(AppError::plc_communication_error(format!(
                "[{}] 模拟通信错误: {} {}",
                self.service_name, operation, address
            )));
        }

        Ok(())
    }

    /// 检查地址是否被注入了强制失败
    fn injected_failure(&self, address: &str) -> Option<String> {
        self.failing_addresses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
    }
}

#[async_trait]
impl IDeviceService for MockDeviceService {
    async fn read_tag(&self, address: &str) -> AppResult<DeviceIoResult> {
        self.simulate_io("read", address).await?;

        if let Some(error) = self.injected_failure(address) {
            return Ok(DeviceIoResult::failed(error));
        }

        let storage = self.data_storage.lock().unwrap_or_else(|e| e.into_inner());
        match storage.get(address) {
            Some(value) => Ok(DeviceIoResult::ok_value(value.clone())),
            // 未预设的地址按默认false处理，模拟PLC布尔标签的初始状态
            None => Ok(DeviceIoResult::ok_value(Value::Bool(false))),
        }
    }

    async fn write_tag(&self, address: &str, value: Value) -> AppResult<DeviceIoResult> {
        self.simulate_io("write", address).await?;

        if let Some(error) = self.injected_failure(address) {
            return Ok(DeviceIoResult::failed(error));
        }

        {
            let mut storage = self.data_storage.lock().unwrap_or_else(|e| e.into_inner());
            storage.insert(address.to_string(), value.clone());
        }

        let mut log = self.write_log.lock().unwrap_or_else(|e| e.into_inner());
        log.push(WriteOperation {
            timestamp: Utc::now(),
            address: address.to_string(),
            value,
        });

        Ok(DeviceIoResult::ok())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
