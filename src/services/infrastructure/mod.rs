/// 基础设施服务模块
///
/// 设备通信、事件分发、运行日志等与业务编排无关的支撑组件

/// 事件监听器注册表
pub mod listener_registry;

/// Mock 设备服务
pub mod mock_device_service;

/// 运行日志实现
pub mod run_logger;

pub use listener_registry::{ListenerRegistry, SubscriptionId};
pub use mock_device_service::{MockDeviceService, WriteOperation};
pub use run_logger::{LogRunLogger, MemoryRunLogger};
