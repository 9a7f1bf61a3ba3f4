/// 终检台执行引擎演示入口
///
/// 使用 Mock 设备服务跑一轮两张地图的演示序列：
/// 第一张地图注入一个失败并演示跳过决策，第二张地图全部成功

use anyhow::Result;
use final_test_bench::models::ErrorResolution;
use final_test_bench::services::domain::TestMapBuilder;
use final_test_bench::services::infrastructure::MockDeviceService;
use final_test_bench::services::steps::{DelayStep, ExpectTagStep, WriteTagStep};
use final_test_bench::services::ServiceContainer;
use final_test_bench::utils::config::ConfigManager;
use final_test_bench::ITestStep;
use log::info;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（不存在时生成默认配置文件）
    let mut config_manager = ConfigManager::new(PathBuf::from("config/app.json"));
    config_manager.load_from_file().await?;
    config_manager.override_from_env();
    config_manager.validate_config()?;
    let config = config_manager.get_config().clone();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging_config.log_level),
    )
    .init();

    info!(
        "🚀 {} v{} 启动 ({})",
        config.app_settings.app_name, config.app_settings.app_version, config.app_settings.environment
    );

    let device = Arc::new(MockDeviceService::new("BenchPlc"));
    for column in 1..=4 {
        device.preset_value(format!("Bench.Col{}.Ready", column), json!(true));
    }
    // 第3列的气密检测注入失败，演示错误解决协议
    device.fail_address("Bench.Col3.Leak", "泄漏传感器无响应");

    let container = ServiceContainer::new(&config, device.clone());

    // 环境信号通道（演示中保持正常）
    let (_connectivity_tx, connectivity_rx) = watch::channel(true);
    let (_auto_ready_tx, auto_ready_rx) = watch::channel(true);
    container
        .error_coordinator
        .start(connectivity_rx, auto_ready_rx);

    container.events.subscribe(|event| {
        info!("[事件] {:?}", event);
    });

    container.boiler_state.begin_session("SN-20260824-001", "GB-240");

    let column_steps = |column: usize| -> Vec<Arc<dyn ITestStep>> {
        vec![
            Arc::new(WriteTagStep::new(
                format!("列{}启动", column),
                format!("Bench.Col{}.Start", column),
                json!(true),
            )),
            Arc::new(DelayStep::new(
                format!("列{}稳定等待", column),
                Duration::from_millis(200),
            )),
            Arc::new(ExpectTagStep::new(
                format!("列{}就绪校验", column),
                format!("Bench.Col{}.Ready", column),
                json!(true),
            )),
        ]
    };

    let map1 = TestMapBuilder::from_columns([
        column_steps(1),
        column_steps(2),
        vec![
            Arc::new(ExpectTagStep::new(
                "列3气密检测",
                "Bench.Col3.Leak",
                json!(false),
            )) as Arc<dyn ITestStep>,
        ],
        column_steps(4),
    ])
    .build();
    let map2 = TestMapBuilder::from_columns([
        vec![Arc::new(WriteTagStep::new(
            "列1结束确认",
            "Bench.Col1.Finish",
            json!(true),
        )) as Arc<dyn ITestStep>],
        vec![],
        vec![],
        vec![],
    ])
    .build();

    container.coordinator.set_maps(vec![map1, map2])?;

    // 失败出现后由演示任务代替操作员做出跳过决策
    {
        let coordinator = container.coordinator.clone();
        let events = container.events.clone();
        events.subscribe(move |event| {
            if let final_test_bench::ExecutionEvent::ErrorOccurred(error) = event {
                info!("[演示] 列{}失败，选择跳过: {}", error.column_index + 1, error.error_message);
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    coordinator.handle_error_resolution(ErrorResolution::Skip);
                });
            }
        });
    }

    container.coordinator.start().await?;
    container.boiler_state.complete_session();

    info!("最终状态: {:?}", container.state_manager.state());
    for row in container.sequence.rows() {
        info!("  [{:?}] {} {}", row.status, row.name, row.message);
    }

    container
        .error_coordinator
        .shutdown(Duration::from_millis(config.interrupt_config.shutdown_wait_ms))
        .await;
    Ok(())
}
