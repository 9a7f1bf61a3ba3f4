use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序统一错误类型
/// 用于封装系统中可能出现的各种错误，提供统一的错误处理机制
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AppError {
    /// 输入/输出错误
    #[error("IO错误: {message} (Kind: {kind})")]
    IoError { message: String, kind: String },

    /// PLC/设备通信相关错误
    ///
    /// **业务含义**: 表示与测试台PLC设备通信过程中发生的各种错误
    /// - 连接建立失败（网络不通、设备离线等）
    /// - 通信超时（设备响应慢、网络延迟等）
    /// - 标签错误（无效地址、类型不匹配等）
    #[error("PLC通信错误: {message}")]
    PlcCommunicationError { message: String },

    /// 数据序列化/反序列化错误
    #[error("序列化错误: {message}")]
    SerializationError { message: String },

    /// 配置相关错误
    #[error("配置错误: {message}")]
    ConfigurationError { message: String },

    /// 验证错误（数据验证失败）
    #[error("验证错误: {message}")]
    ValidationError { message: String },

    /// 业务逻辑错误
    #[error("业务逻辑错误: {message}")]
    BusinessLogicError { message: String },
}

impl AppError {
    /// 创建IO错误
    pub fn io_error(message: impl Into<String>, kind: impl Into<String>) -> Self {
        AppError::IoError {
            message: message.into(),
            kind: kind.into(),
        }
    }

    /// 创建PLC通信错误
    pub fn plc_communication_error(message: impl Into<String>) -> Self {
        AppError::PlcCommunicationError {
            message: message.into(),
        }
    }

    /// 创建序列化错误
    pub fn serialization_error(message: impl Into<String>) -> Self {
        AppError::SerializationError {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn configuration_error(message: impl Into<String>) -> Self {
        AppError::ConfigurationError {
            message: message.into(),
        }
    }

    /// 创建验证错误
    pub fn validation_error(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            message: message.into(),
        }
    }

    /// 创建业务逻辑错误
    pub fn business_logic_error(message: impl Into<String>) -> Self {
        AppError::BusinessLogicError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::io_error(err.to_string(), err.kind().to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::serialization_error(err.to_string())
    }
}

/// 应用程序统一结果类型
pub type AppResult<T> = Result<T, AppError>;
