/// 应用层服务模块
///
/// 面向操作员界面的状态服务：步骤表格、错误横幅、中断提示

/// 活动错误码服务
pub mod active_errors_service;

/// 中断提示消息状态
pub mod interrupt_message;

/// 步骤状态上报门面
pub mod step_status_reporter;

/// 测试序列状态表格服务
pub mod test_sequence_service;

pub use active_errors_service::{ActiveErrorsService, ERR_PLC_CONNECTION_LOST, ERR_TAG_READ_TIMEOUT};
pub use interrupt_message::InterruptMessageState;
pub use step_status_reporter::StepStatusReporter;
pub use test_sequence_service::{SequenceRow, TestSequenseService};
