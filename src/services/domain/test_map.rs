/// 测试地图
///
/// 4列并行的步骤矩阵：每行是4列在同一阶段执行的步骤，
/// 空槽位表示该列在该行无事可做。地图之间是硬屏障：
/// 上一张地图的全部失败解决完毕才能进入下一张

use crate::services::traits::ITestStep;
use std::sync::Arc;

/// 测试台的固定列数
pub const COLUMN_COUNT: usize = 4;

/// 地图中的一行（4列各一个可选步骤）
pub struct TestMapRow {
    pub steps: [Option<Arc<dyn ITestStep>>; COLUMN_COUNT],
}

/// 一张测试地图
pub struct TestMap {
    rows: Vec<TestMapRow>,
}

impl TestMap {
    /// 行列表
    pub fn rows(&self) -> &[TestMapRow] {
        &self.rows
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// 测试地图构建器
///
/// 支持逐行构建或按列展开（列长不齐时短列用空槽补齐）
pub struct TestMapBuilder {
    rows: Vec<TestMapRow>,
}

impl TestMapBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// 追加一行
    pub fn row(mut self, steps: [Option<Arc<dyn ITestStep>>; COLUMN_COUNT]) -> Self {
        self.rows.push(TestMapRow { steps });
        self
    }

    /// 按列展开构建：第i列的步骤序列依次落入各行的第i个槽位
    pub fn from_columns(columns: [Vec<Arc<dyn ITestStep>>; COLUMN_COUNT]) -> Self {
        let row_count = columns.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut rows = Vec::with_capacity(row_count);
        for row_index in 0..row_count {
            let steps = std::array::from_fn(|col| columns[col].get(row_index).cloned());
            rows.push(TestMapRow { steps });
        }
        Self { rows }
    }

    pub fn build(self) -> Arc<TestMap> {
        Arc::new(TestMap { rows: self.rows })
    }
}

impl Default for TestMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}
