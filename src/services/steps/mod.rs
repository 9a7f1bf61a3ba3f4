/// 具体测试步骤实现

/// 延时步骤
pub mod delay_step;

/// 标签期望值校验步骤
pub mod expect_tag_step;

/// 标签写入步骤
pub mod write_tag_step;

pub use delay_step::DelayStep;
pub use expect_tag_step::ExpectTagStep;
pub use write_tag_step::WriteTagStep;
