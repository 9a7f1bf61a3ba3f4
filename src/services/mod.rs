/// 服务层模块

/// 应用层服务
pub mod application;

/// 服务容器
pub mod container;

/// 领域服务
pub mod domain;

/// 基础设施服务
pub mod infrastructure;

/// 具体测试步骤
pub mod steps;

/// 核心接口定义
pub mod traits;

pub use container::ServiceContainer;
pub use traits::{IDeviceService, ITestRunLogger, ITestStep};
