/// 运行日志实现
///
/// 操作员可读的测试过程日志（第二日志汇），与 `log` 运维日志并行。
/// 生产环境使用 `LogRunLogger` 输出到统一日志，测试中使用 `MemoryRunLogger`
/// 以便断言日志内容

use crate::services::traits::ITestRunLogger;
use log::{error, info, warn};
use std::sync::Mutex;

/// 基于 `log` 宏的运行日志
pub struct LogRunLogger;

impl LogRunLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogRunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ITestRunLogger for LogRunLogger {
    fn log_step_start(&self, step_name: &str) {
        info!("[RunLog] ▶ 开始步骤: {}", step_name);
    }

    fn log_step_end(&self, step_name: &str) {
        info!("[RunLog] ✔ 完成步骤: {}", step_name);
    }

    fn log_information(&self, message: &str) {
        info!("[RunLog] {}", message);
    }

    fn log_warning(&self, message: &str) {
        warn!("[RunLog] {}", message);
    }

    fn log_error(&self, message: &str) {
        error!("[RunLog] {}", message);
    }
}

/// 内存运行日志（用于测试断言）
pub struct MemoryRunLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryRunLogger {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }

    /// 获取已记录的全部行
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 是否存在包含给定片段的行
    pub fn contains(&self, fragment: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|line| line.contains(fragment))
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }
}

impl Default for MemoryRunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ITestRunLogger for MemoryRunLogger {
    fn log_step_start(&self, step_name: &str) {
        self.push(format!("START {}", step_name));
    }

    fn log_step_end(&self, step_name: &str) {
        self.push(format!("END {}", step_name));
    }

    fn log_information(&self, message: &str) {
        self.push(format!("INFO {}", message));
    }

    fn log_warning(&self, message: &str) {
        self.push(format!("WARN {}", message));
    }

    fn log_error(&self, message: &str) {
        self.push(format!("ERROR {}", message));
    }
}
