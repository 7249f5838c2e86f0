// ==========================================
// 航次排产系统 - 命令行入口
// ==========================================
// 用法:
//   voyage-aps generate <scenario.json> <request.json> [db_path]
//   voyage-aps compare  <scenario.json> <request.json>
//
// scenario.json: 主数据快照 (船舶/港口/泊位/航线/承诺/油价)
// request.json:  生成请求 (日期范围/策略/利用率上下限)
// db_path 缺省时使用 VOYAGE_APS_DB_PATH 或用户数据目录
// 示例: voyage-aps compare demos/scenario.json demos/request.json
// ==========================================

use std::sync::Arc;

use anyhow::{bail, Context};
use voyage_aps::app::{get_default_db_path, AppState};
use voyage_aps::api::JsonFileMasterData;
use voyage_aps::domain::schedule::{Schedule, ScheduleConfig};
use voyage_aps::engine::CancelToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voyage_aps::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, scenario, request_path) = match args.as_slice() {
        [command, scenario, request, ..] => (command.as_str(), scenario, request),
        _ => bail!("用法: voyage-aps <generate|compare> <scenario.json> <request.json> [db_path]"),
    };

    tracing::info!("{} v{}", voyage_aps::APP_NAME, voyage_aps::VERSION);

    let raw = tokio::fs::read_to_string(request_path)
        .await
        .with_context(|| format!("读取请求文件失败: {}", request_path))?;
    let request: ScheduleConfig = serde_json::from_str(&raw).context("请求文件格式错误")?;

    let master_data = Arc::new(JsonFileMasterData::new(scenario));

    match command {
        "generate" => {
            let db_path = args.get(3).cloned().unwrap_or_else(get_default_db_path);
            let state = AppState::new(db_path, master_data)?;
            let schedule = state
                .schedule_manager
                .generate(request, "cli", CancelToken::new())
                .await?;
            print_schedule(&schedule)?;
            println!("已保存至 {}", state.db_path);
        }
        "compare" => {
            // 比较结果不落库, 使用内存库
            let state = AppState::new(":memory:".to_string(), master_data)?;
            let candidates = state
                .schedule_manager
                .compare_strategies(request, Vec::new(), CancelToken::new())
                .await?;
            for schedule in &candidates {
                print_schedule(schedule)?;
            }
        }
        other => bail!("未知命令: {} (可选 generate / compare)", other),
    }
    Ok(())
}

fn print_schedule(schedule: &Schedule) -> anyhow::Result<()> {
    println!("==================================================");
    println!("{} [{}] 策略={}", schedule.name, schedule.schedule_id, schedule.strategy);
    println!("{}", serde_json::to_string_pretty(&schedule.kpi)?);
    for failure in &schedule.failures {
        println!("未分配 {} ({}): {}", failure.commitment_id, failure.kind, failure.reasons.join("; "));
    }
    for conflict in schedule.open_conflicts() {
        println!("冲突 {} [{:?}] {}", conflict.conflict_id, conflict.severity, conflict.description);
    }
    for warning in &schedule.warnings {
        println!("提示: {}", warning);
    }
    Ok(())
}
