use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 应用程序主配置结构
/// 包含测试执行引擎运行所需的所有配置信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 应用程序基本设置
    pub app_settings: AppSettings,
    /// 设备通信配置
    pub device_config: DeviceConfig,
    /// 中断处理配置
    pub interrupt_config: InterruptConfig,
    /// 日志配置
    pub logging_config: LoggingConfig,
}

/// 应用程序基本设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// 应用程序名称
    pub app_name: String,
    /// 应用程序版本
    pub app_version: String,
    /// 运行环境 (development, testing, production)
    pub environment: String,
    /// 是否启用调试模式
    pub debug_mode: bool,
}

/// 设备通信配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// 设备类型 (opcua, modbus, mock)
    pub device_type: String,
    /// 设备地址
    pub host: String,
    /// 设备端口
    pub port: u16,
    /// 读取超时时间（毫秒）
    pub read_timeout_ms: u64,
    /// 写入超时时间（毫秒）
    pub write_timeout_ms: u64,
}

/// 中断处理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptConfig {
    /// PLC断线后执行硬复位前的等待时间（毫秒）
    pub plc_reconnect_delay_ms: u64,
    /// 停机时等待在途中断处理结束的上限（毫秒）
    pub shutdown_wait_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别 (debug, info, warn, error)
    pub log_level: String,
    /// 是否启用控制台输出
    pub console_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_settings: AppSettings::default(),
            device_config: DeviceConfig::default(),
            interrupt_config: InterruptConfig::default(),
            logging_config: LoggingConfig::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "FinalTestBench".to_string(),
            app_version: "1.0.0".to_string(),
            environment: "development".to_string(),
            debug_mode: true,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: "mock".to_string(),
            host: "127.0.0.1".to_string(),
            port: 4840,
            read_timeout_ms: 3000,
            write_timeout_ms: 3000,
        }
    }
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            plc_reconnect_delay_ms: 5000,
            shutdown_wait_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            console_output: true,
        }
    }
}

/// 配置管理器
/// 负责加载、保存和管理应用程序配置
pub struct ConfigManager {
    config: AppConfig,
    config_file_path: PathBuf,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_file_path: PathBuf) -> Self {
        Self {
            config: AppConfig::default(),
            config_file_path,
        }
    }

    /// 从文件加载配置
    pub async fn load_from_file(&mut self) -> AppResult<()> {
        if !self.config_file_path.exists() {
            // 如果配置文件不存在，创建默认配置文件
            self.save_to_file().await?;
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&self.config_file_path)
            .await
            .map_err(|e| AppError::io_error(format!("读取配置文件失败: {}", e), e.kind().to_string()))?;

        self.config = serde_json::from_str(&content)
            .map_err(|e| AppError::configuration_error(format!("解析配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 将配置保存到文件
    pub async fn save_to_file(&self) -> AppResult<()> {
        // 确保目录存在
        if let Some(parent) = self.config_file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::io_error(format!("创建配置目录失败: {}", e), e.kind().to_string()))?;
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| AppError::serialization_error(format!("序列化配置失败: {}", e)))?;

        tokio::fs::write(&self.config_file_path, content)
            .await
            .map_err(|e| AppError::io_error(format!("写入配置文件失败: {}", e), e.kind().to_string()))?;

        Ok(())
    }

    /// 从环境变量覆盖配置
    pub fn override_from_env(&mut self) {
        // 设备配置
        if let Ok(host) = std::env::var("DEVICE_HOST") {
            self.config.device_config.host = host;
        }
        if let Ok(port) = std::env::var("DEVICE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.config.device_config.port = port;
            }
        }
        if let Ok(device_type) = std::env::var("DEVICE_TYPE") {
            self.config.device_config.device_type = device_type;
        }

        // 应用程序设置
        if let Ok(env) = std::env::var("APP_ENVIRONMENT") {
            self.config.app_settings.environment = env;
        }
        if let Ok(debug) = std::env::var("DEBUG_MODE") {
            self.config.app_settings.debug_mode = debug.to_lowercase() == "true";
        }
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            self.config.logging_config.log_level = log_level;
        }
    }

    /// 获取配置的只读引用
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取配置的可变引用
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 验证配置的有效性
    pub fn validate_config(&self) -> AppResult<()> {
        if self.config.device_config.host.is_empty() {
            return Err(AppError::configuration_error("设备主机地址不能为空"));
        }

        if self.config.device_config.port == 0 {
            return Err(AppError::configuration_error("设备端口号不能为0"));
        }

        let valid_environments = ["development", "testing", "production"];
        if !valid_environments.contains(&self.config.app_settings.environment.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的环境配置: {}，有效值: {:?}",
                self.config.app_settings.environment, valid_environments
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging_config.log_level.as_str()) {
            return Err(AppError::configuration_error(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.config.logging_config.log_level, valid_log_levels
            )));
        }

        Ok(())
    }
}
