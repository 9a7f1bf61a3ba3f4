/// 环境中断协调器集成测试
///
/// 覆盖中断行为表、单飞处理、自动恢复与复位语义

mod common;

use common::{make_container, wait_until, ScriptedStep};
use final_test_bench::models::{ExecutionState, InterruptReason};
use final_test_bench::services::domain::TestMapBuilder;
use final_test_bench::services::ITestStep;
use final_test_bench::ExecutionEvent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// 自动模式关闭触发暂停等待，恢复后解除
#[tokio::test]
async fn test_auto_mode_disabled_pauses_and_recovers() {
    let (container, _device) = make_container();
    container.activity_tracker.set_test_execution_active(true);

    let recovered = Arc::new(AtomicUsize::new(0));
    {
        let recovered = recovered.clone();
        container.events.subscribe(move |event| {
            if matches!(event, ExecutionEvent::Recovered) {
                recovered.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    container
        .error_coordinator
        .handle_interrupt(InterruptReason::AutoModeDisabled)
        .await;

    assert!(container.pause_token.is_paused());
    assert!(container.interrupt_message.current().is_some());

    container.error_coordinator.try_resume_from_pause().await;

    assert!(!container.pause_token.is_paused());
    assert!(container.interrupt_message.current().is_none());
    assert_eq!(recovered.load(Ordering::SeqCst), 1);
}

/// PLC断线后等待窗口内未恢复则硬复位
#[tokio::test]
async fn test_plc_connection_lost_resets_after_delay() {
    let (container, _device) = make_container();
    container.activity_tracker.set_test_execution_active(true);
    container.boiler_state.begin_session("SN-1", "GB-240");
    container.sequence.add_step("扫码", "", true);

    let resets = Arc::new(AtomicUsize::new(0));
    {
        let resets = resets.clone();
        container.events.subscribe(move |event| {
            if matches!(event, ExecutionEvent::Reset) {
                resets.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    container
        .error_coordinator
        .handle_interrupt(InterruptReason::PlcConnectionLost)
        .await;

    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(container.state_manager.state(), ExecutionState::Failed);
    // 硬复位放弃会话并清空状态表格
    assert!(!container.boiler_state.has_session());
    assert!(container.sequence.rows().is_empty());
    assert!(!container.pause_token.is_paused());
    assert!(container.active_errors.active_codes().is_empty());
}

/// 等待窗口内连接恢复则不复位
#[tokio::test]
async fn test_plc_reconnect_within_window_avoids_reset() {
    let (container, _device) = make_container();
    container.activity_tracker.set_test_execution_active(true);
    container.boiler_state.begin_session("SN-2", "GB-240");

    let error_coordinator = container.error_coordinator.clone();
    let handling = tokio::spawn(async move {
        error_coordinator
            .handle_interrupt(InterruptReason::PlcConnectionLost)
            .await;
    });

    // 等中断进入暂停后立即模拟连接恢复
    let pause_token = container.pause_token.clone();
    assert!(wait_until(move || pause_token.is_paused(), Duration::from_secs(1)).await);
    container.error_coordinator.try_resume_from_pause().await;

    handling.await.unwrap();

    assert!(container.boiler_state.has_session());
    assert!(!container.pause_token.is_paused());
    assert_ne!(container.state_manager.state(), ExecutionState::Failed);
}

/// 中断处理单飞：处理期间的新中断被丢弃
#[tokio::test]
async fn test_interrupt_handling_is_single_flight() {
    let (container, _device) = make_container();
    container.activity_tracker.set_test_execution_active(true);

    let resets = Arc::new(AtomicUsize::new(0));
    {
        let resets = resets.clone();
        container.events.subscribe(move |event| {
            if matches!(event, ExecutionEvent::Reset) {
                resets.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    let first = {
        let error_coordinator = container.error_coordinator.clone();
        tokio::spawn(async move {
            error_coordinator
                .handle_interrupt(InterruptReason::PlcConnectionLost)
                .await;
        })
    };
    let second = {
        let error_coordinator = container.error_coordinator.clone();
        tokio::spawn(async move {
            error_coordinator
                .handle_interrupt(InterruptReason::PlcConnectionLost)
                .await;
        })
    };
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(resets.load(Ordering::SeqCst), 1);
}

/// 标签读取超时无等待窗口，立即硬复位
#[tokio::test]
async fn test_tag_timeout_resets_immediately() {
    let (container, _device) = make_container();
    container.activity_tracker.set_test_execution_active(true);
    container.boiler_state.begin_session("SN-4", "GB-240");

    container
        .error_coordinator
        .handle_interrupt(InterruptReason::TagTimeout)
        .await;

    assert_eq!(container.state_manager.state(), ExecutionState::Failed);
    assert!(!container.boiler_state.has_session());
}

/// 软停止保留扫码行与锅炉会话
#[tokio::test]
async fn test_force_stop_preserves_session_and_scan_rows() {
    let (container, _device) = make_container();
    container.boiler_state.begin_session("SN-3", "GB-240");
    container.sequence.add_step("扫码", "", true);
    container.sequence.add_step("写入压力", "", false);
    container.pause_token.pause();

    container.error_coordinator.force_stop().await;

    assert_eq!(container.state_manager.state(), ExecutionState::Idle);
    assert!(container.boiler_state.has_session());
    let rows = container.sequence.rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_scan_step);
    assert!(!container.pause_token.is_paused());
}

/// 空闲时的环境信号不触发中断
#[tokio::test]
async fn test_signals_ignored_while_idle() {
    let (container, _device) = make_container();

    let (connectivity_tx, connectivity_rx) = watch::channel(true);
    let (_auto_ready_tx, auto_ready_rx) = watch::channel(true);
    container
        .error_coordinator
        .start(connectivity_rx, auto_ready_rx);

    connectivity_tx.send(false).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!container.pause_token.is_paused());
    assert!(container.interrupt_message.current().is_none());

    container
        .error_coordinator
        .shutdown(Duration::from_millis(200))
        .await;
}

/// 测试活动期间自动模式信号触发中断，信号恢复后自动解除
#[tokio::test]
async fn test_auto_ready_signal_drives_pause_and_recovery() {
    let (container, _device) = make_container();

    let slow = ScriptedStep::slow_ok("长时步骤", Duration::from_millis(50));
    let after = ScriptedStep::always_ok("后续步骤");
    let map = TestMapBuilder::from_columns([
        vec![
            slow as Arc<dyn ITestStep>,
            after.clone() as Arc<dyn ITestStep>,
        ],
        vec![],
        vec![],
        vec![],
    ])
    .build();
    container.coordinator.set_maps(vec![map]).unwrap();

    let (_connectivity_tx, connectivity_rx) = watch::channel(true);
    let (auto_ready_tx, auto_ready_rx) = watch::channel(true);
    container
        .error_coordinator
        .start(connectivity_rx, auto_ready_rx);

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

    auto_ready_tx.send(false).unwrap();
    let pause_token = container.pause_token.clone();
    assert!(wait_until(move || pause_token.is_paused(), Duration::from_secs(2)).await);

    auto_ready_tx.send(true).unwrap();
    let pause_token = container.pause_token.clone();
    assert!(wait_until(move || !pause_token.is_paused(), Duration::from_secs(2)).await);

    run.await.unwrap().unwrap();
    assert_eq!(container.state_manager.state(), ExecutionState::Completed);
    assert_eq!(after.execution_count(), 1);

    container
        .error_coordinator
        .shutdown(Duration::from_millis(200))
        .await;
}
