// ==========================================
// 车皮路由对账系统 - 命令行入口
// ==========================================
// 子命令: reconcile / expenses / suggest / import-ref / config / log
// ==========================================

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wagon_route_recon::api::ReconcileRequest;
use wagon_route_recon::app::AppState;
use wagon_route_recon::config::{config_keys, AppConfig, ConfigManager, CONFIG_FILE};
use wagon_route_recon::exporter::{default_route_id_path, export_suggestions};
use wagon_route_recon::importer::ReferenceTable;
use wagon_route_recon::{logging, APP_NAME, VERSION};

#[derive(Parser, Debug)]
#[command(name = "wagon-route-recon", version, about = "车皮路由对账系统")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, value_name = "FILE", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 执行对账并导出 Route_ID
    Reconcile {
        /// 日报目录（默认取配置）
        #[arg(long)]
        stg_folder: Option<PathBuf>,
        /// 历史日报文件
        #[arg(long)]
        existing: Option<PathBuf>,
        /// Route_ID 导出路径
        #[arg(long)]
        output: Option<PathBuf>,
        /// 对账全表导出路径
        #[arg(long)]
        full_table: Option<PathBuf>,
    },
    /// 处理费用目录
    Expenses {
        #[arg(long)]
        folder: Option<PathBuf>,
        /// 外部 Route_ID 文件（默认使用最近一次对账结果）
        #[arg(long)]
        route_id_file: Option<PathBuf>,
    },
    /// 生成路由建议
    Suggest {
        #[arg(long)]
        stg_folder: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 导入参照表（znp / exceptions / overrides / active / matrix）
    ImportRef {
        #[arg(value_parser = parse_table)]
        table: ReferenceTable,
        /// 源文件（默认取配置）
        file: Option<PathBuf>,
    },
    /// 查看或修改配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// 查看最近的处理日志
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set { key: String, value: String },
}

fn parse_table(value: &str) -> Result<ReferenceTable, String> {
    ReferenceTable::parse(value).ok_or_else(|| format!("未知的参照表: {}", value))
}

/// 参照表在配置中的默认源文件
fn configured_source(config: &AppConfig, table: ReferenceTable) -> &str {
    match table {
        ReferenceTable::PlanningCode => &config.znp_path,
        ReferenceTable::Exception => &config.exceptions_path,
        ReferenceTable::Override => &config.overrides_path,
        ReferenceTable::ActiveCode => &config.active_path,
        ReferenceTable::Matrix => &config.matrix_path,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    tracing::info!("{} v{}", APP_NAME, VERSION);

    let mut manager = ConfigManager::load_or_create(&cli.config)
        .with_context(|| format!("加载配置失败: {}", cli.config.display()))?;

    if let Command::Config { action } = &cli.command {
        return run_config(&mut manager, action);
    }

    let config = manager.config().clone();
    let state = AppState::new(&config).map_err(|e| anyhow!(e))?;

    match cli.command {
        Command::Reconcile {
            stg_folder,
            existing,
            output,
            full_table,
        } => {
            let request = ReconcileRequest {
                stg_folder: stg_folder.unwrap_or_else(|| config.stg_folder_path()),
                existing_data: existing.or_else(|| config.existing_data_file()),
                export_path: output.unwrap_or_else(|| {
                    default_route_id_path(&config.output_path(), Local::now().naive_local())
                }),
                full_table_path: full_table,
            };
            let summary = state
                .reconcile_api
                .run(&request)
                .await
                .context("对账失败")?;
            manager
                .set_value(
                    config_keys::ROUTE_ID_PATH,
                    &request.export_path.display().to_string(),
                )
                .context("更新 route_id_path 失败")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Expenses {
            folder,
            route_id_file,
        } => {
            let folder = folder.unwrap_or_else(|| config.expense_folder_path());
            let summary = state
                .expense_api
                .process_folder(&folder, &config.output_path(), route_id_file.as_deref())
                .context("费用处理失败")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Suggest { stg_folder, output } => {
            let folder = stg_folder.unwrap_or_else(|| config.stg_folder_path());
            let suggestions = state
                .reconcile_api
                .suggest(&folder)
                .await
                .context("路由建议生成失败")?;
            let path = output.unwrap_or_else(|| config.output_path().join("Route_suggestions.csv"));
            let rows = export_suggestions(&suggestions, &path)?;
            println!("{} 条建议已写入 {}", rows, path.display());
        }
        Command::ImportRef { table, file } => {
            let path = match file {
                Some(path) => path,
                None => {
                    let configured = configured_source(&config, table).trim();
                    if configured.is_empty() {
                        return Err(anyhow!("未指定 {} 的源文件，且配置中为空", table));
                    }
                    PathBuf::from(configured)
                }
            };
            let summary = state
                .reference_api
                .import(table, &path)
                .with_context(|| format!("导入 {} 失败", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Log { limit } => {
            for entry in state.log_repo.list_recent(limit)? {
                println!(
                    "{}  {:<8} {:<18} {}  {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.status,
                    entry.operation,
                    entry.file_name.unwrap_or_default(),
                    entry.message.unwrap_or_default()
                );
            }
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

fn run_config(manager: &mut ConfigManager, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(manager.config())?);
        }
        ConfigAction::Set { key, value } => {
            manager
                .set_value(key, value)
                .with_context(|| format!("设置配置项 {} 失败", key))?;
            println!("{} = {}", key, manager.get_value(key)?);
        }
    }
    Ok(())
}
