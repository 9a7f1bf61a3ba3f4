/// 测试执行协调器集成测试
///
/// 覆盖4列并行执行、地图屏障、暂停回合与操作员决策协议

mod common;

use common::{make_container, wait_until, ScriptedStep};
use final_test_bench::models::{
    ErrorResolution, ExecutionState, ExecutionStopReason, StepDisplayStatus,
};
use final_test_bench::services::domain::TestMapBuilder;
use final_test_bench::services::ITestStep;
use final_test_bench::ExecutionEvent;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn steps(columns: [Vec<Arc<ScriptedStep>>; 4]) -> [Vec<Arc<dyn ITestStep>>; 4] {
    columns.map(|column| {
        column
            .into_iter()
            .map(|step| step as Arc<dyn ITestStep>)
            .collect()
    })
}

/// 全部列成功，序列以 Completed 结束
#[tokio::test]
async fn test_happy_path_completes() {
    let (container, _device) = make_container();
    let column_steps: Vec<Arc<ScriptedStep>> = (0..4)
        .map(|i| ScriptedStep::always_ok(&format!("步骤{}", i)))
        .collect();

    let map = TestMapBuilder::from_columns(steps([
        vec![column_steps[0].clone()],
        vec![column_steps[1].clone()],
        vec![column_steps[2].clone()],
        vec![column_steps[3].clone()],
    ]))
    .build();
    container.coordinator.set_maps(vec![map]).unwrap();

    container.coordinator.start().await.unwrap();

    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
    for step in &column_steps {
        assert_eq!(step.execution_count(), 1);
    }
    assert!(container
        .sequence
        .rows()
        .iter()
        .all(|row| row.status == StepDisplayStatus::Done));
}

/// 一列失败时其余列不被中止，全部跑完后进入暂停回合
#[tokio::test]
async fn test_sibling_columns_finish_when_one_fails() {
    let (container, _device) = make_container();
    let failing = ScriptedStep::fails_once("磁盘写入", "disk error");
    let sibling = ScriptedStep::slow_ok("慢步骤", Duration::from_millis(100));

    let map = TestMapBuilder::from_columns(steps([
        vec![failing.clone()],
        vec![sibling.clone()],
        vec![],
        vec![],
    ]))
    .build();
    container.coordinator.set_maps(vec![map]).unwrap();

    let errors = Arc::new(Mutex::new(Vec::new()));
    {
        let errors = errors.clone();
        container.events.subscribe(move |event| {
            if let ExecutionEvent::ErrorOccurred(error) = event {
                errors.lock().unwrap().push(error.clone());
            }
        });
    }

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::PausedOnError,
            Duration::from_secs(2),
        )
        .await
    );

    // 失败列之外的列已正常完成
    assert_eq!(sibling.execution_count(), 1);
    assert!(container.coordinator.executors()[0].has_failed());
    assert!(!container.coordinator.executors()[1].has_failed());

    // 暂停回合只上报一个代表错误
    {
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column_index, 0);
        assert_eq!(errors[0].error_message, "disk error");
    }

    container
        .coordinator
        .handle_error_resolution(ErrorResolution::Retry);
    run.await.unwrap().unwrap();

    // 重试用同一实例，第二次成功
    assert_eq!(failing.execution_count(), 2);
    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
}

/// 跳过决策：错误行保留，下一张地图继续执行
#[tokio::test]
async fn test_skip_keeps_error_row_and_proceeds() {
    let (container, _device) = make_container();
    let failing = ScriptedStep::fails_once("气密检测", "泄漏");
    let next_map_step = ScriptedStep::always_ok("结束确认");

    let map1 = TestMapBuilder::from_columns(steps([vec![failing], vec![], vec![], vec![]])).build();
    let map2 =
        TestMapBuilder::from_columns(steps([vec![next_map_step.clone()], vec![], vec![], vec![]]))
            .build();
    container.coordinator.set_maps(vec![map1, map2]).unwrap();

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::PausedOnError,
            Duration::from_secs(2),
        )
        .await
    );
    // 地图屏障：决策前第二张地图不得开始
    assert_eq!(next_map_step.execution_count(), 0);

    container
        .coordinator
        .handle_error_resolution(ErrorResolution::Skip);
    run.await.unwrap().unwrap();

    assert_eq!(next_map_step.execution_count(), 1);
    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
    assert!(container.state_manager.had_skipped_error());
    // 状态表格中的错误行保留原样
    assert!(container
        .sequence
        .rows()
        .iter()
        .any(|row| row.status == StepDisplayStatus::Error));
}

/// 执行期间拒绝更换测试地图
#[tokio::test]
async fn test_set_maps_rejected_while_active() {
    let (container, _device) = make_container();
    let slow = ScriptedStep::slow_ok("慢步骤", Duration::from_millis(200));
    let map = TestMapBuilder::from_columns(steps([vec![slow], vec![], vec![], vec![]])).build();
    container.coordinator.set_maps(vec![map.clone()]).unwrap();

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::Running,
            Duration::from_secs(2),
        )
        .await
    );

    assert!(container.coordinator.set_maps(vec![map]).is_err());
    run.await.unwrap().unwrap();
}

/// 暂停回合仍属于本轮执行，更换地图同样被拒绝且失败锁存不被破坏
#[tokio::test]
async fn test_set_maps_rejected_while_paused_on_error() {
    let (container, _device) = make_container();
    let failing = ScriptedStep::fails_once("标定流量", "偏差过大");
    let map = TestMapBuilder::from_columns(steps([vec![failing], vec![], vec![], vec![]])).build();
    container.coordinator.set_maps(vec![map]).unwrap();

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::PausedOnError,
            Duration::from_secs(2),
        )
        .await
    );
    assert!(container.coordinator.is_running());

    let replacement =
        TestMapBuilder::from_columns(steps([vec![], vec![], vec![], vec![]])).build();
    assert!(container.coordinator.set_maps(vec![replacement]).is_err());
    // 失败锁存与失败步骤实例保持原样，等待中的决策仍然有效
    assert!(container.coordinator.executors()[0].has_failed());

    container
        .coordinator
        .handle_error_resolution(ErrorResolution::Retry);
    run.await.unwrap().unwrap();

    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
    assert!(!container.coordinator.is_running());
}

/// 多列同时失败：只上报一个代表错误，一次决策作用于全部失败列
#[tokio::test]
async fn test_concurrent_lane_failures_share_one_episode() {
    let (container, _device) = make_container();
    let failing0 = ScriptedStep::fails_once("气密检测", "泄漏");
    let failing2 = ScriptedStep::fails_once("拧紧阀门", "超出扭矩上限");
    let next_map_step = ScriptedStep::always_ok("结束确认");

    let map1 = TestMapBuilder::from_columns(steps([
        vec![failing0.clone()],
        vec![],
        vec![failing2.clone()],
        vec![],
    ]))
    .build();
    let map2 =
        TestMapBuilder::from_columns(steps([vec![next_map_step.clone()], vec![], vec![], vec![]]))
            .build();
    container.coordinator.set_maps(vec![map1, map2]).unwrap();

    let errors = Arc::new(Mutex::new(Vec::new()));
    {
        let errors = errors.clone();
        container.events.subscribe(move |event| {
            if let ExecutionEvent::ErrorOccurred(error) = event {
                errors.lock().unwrap().push(error.clone());
            }
        });
    }

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::PausedOnError,
            Duration::from_secs(2),
        )
        .await
    );

    assert!(container.coordinator.executors()[0].has_failed());
    assert!(container.coordinator.executors()[2].has_failed());
    // 同一暂停回合只上报列索引最小的代表错误，第二个失败被吸收
    {
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column_index, 0);
    }
    assert_eq!(container.state_manager.error_count(), 2);

    container
        .coordinator
        .handle_error_resolution(ErrorResolution::Retry);
    run.await.unwrap().unwrap();

    // 一次重试决策同时作用于两个失败列
    assert_eq!(failing0.execution_count(), 2);
    assert_eq!(failing2.execution_count(), 2);
    assert_eq!(next_map_step.execution_count(), 1);
    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
    assert_eq!(errors.lock().unwrap().len(), 1);
}

/// 无待处理回合时的决策被丢弃（重复点击）
#[tokio::test]
async fn test_duplicate_resolution_is_dropped() {
    let (container, _device) = make_container();
    let failing = ScriptedStep::fails_once("标定", "偏差过大");
    let map = TestMapBuilder::from_columns(steps([vec![failing], vec![], vec![], vec![]])).build();
    container.coordinator.set_maps(vec![map]).unwrap();

    // 执行前的决策无效
    container
        .coordinator
        .handle_error_resolution(ErrorResolution::Skip);

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::PausedOnError,
            Duration::from_secs(2),
        )
        .await
    );

    container
        .coordinator
        .handle_error_resolution(ErrorResolution::Retry);
    // 重复决策被丢弃，不影响结果
    container
        .coordinator
        .handle_error_resolution(ErrorResolution::Skip);
    run.await.unwrap().unwrap();

    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
    assert!(!container.state_manager.had_skipped_error());
}

/// 按失败结算的停止请求让序列以 Failed 结束
#[tokio::test]
async fn test_stop_as_failure() {
    let (container, _device) = make_container();
    let slow = ScriptedStep::slow_ok("长时步骤", Duration::from_secs(5));
    let map = TestMapBuilder::from_columns(steps([vec![slow], vec![], vec![], vec![]])).build();
    container.coordinator.set_maps(vec![map]).unwrap();

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::Running,
            Duration::from_secs(2),
        )
        .await
    );

    container
        .coordinator
        .stop(ExecutionStopReason::PlcForceStop, "PLC强制停止", true);
    run.await.unwrap().unwrap();

    assert_eq!(container.state_manager.state(), ExecutionState::Failed);
    assert_eq!(
        container.flow_state.snapshot().reason,
        ExecutionStopReason::PlcForceStop
    );
}

/// 操作员停止且不按失败结算时序列以 Completed 结束
#[tokio::test]
async fn test_clean_stop_is_not_failure() {
    let (container, _device) = make_container();
    let slow = ScriptedStep::slow_ok("长时步骤", Duration::from_secs(5));
    let map = TestMapBuilder::from_columns(steps([vec![slow], vec![], vec![], vec![]])).build();
    container.coordinator.set_maps(vec![map]).unwrap();

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    let state_manager = container.state_manager.clone();
    assert!(
        wait_until(
            move || state_manager.state() == ExecutionState::Running,
            Duration::from_secs(2),
        )
        .await
    );

    container
        .coordinator
        .stop(ExecutionStopReason::Operator, "操作员停止", false);
    run.await.unwrap().unwrap();

    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
}

/// 暂停闸门让列在下一个检查点冻结，恢复后继续
#[tokio::test]
async fn test_pause_gate_freezes_columns_between_steps() {
    let (container, _device) = make_container();
    let first = ScriptedStep::slow_ok("第一步", Duration::from_millis(50));
    let second = ScriptedStep::always_ok("第二步");
    let map = TestMapBuilder::from_columns(steps([
        vec![first.clone(), second.clone()],
        vec![],
        vec![],
        vec![],
    ]))
    .build();
    container.coordinator.set_maps(vec![map]).unwrap();

    container.pause_token.pause();

    let coordinator = container.coordinator.clone();
    let run = tokio::spawn(async move { coordinator.start().await });

    // 第一步在暂停闸门处冻结，尚未开始
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(first.execution_count(), 0);
    assert!(!run.is_finished());

    container.pause_token.resume();
    run.await.unwrap().unwrap();

    assert_eq!(first.execution_count(), 1);
    assert_eq!(second.execution_count(), 1);
    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
}

/// 未装载地图时启动返回错误
#[tokio::test]
async fn test_start_without_maps_fails() {
    let (container, _device) = make_container();
    assert!(container.coordinator.start().await.is_err());
    assert_eq!(container.state_manager.state(), ExecutionState::Idle);
}
