// ==========================================
// 车皮路由对账系统 - 应用状态
// ==========================================
// 职责: 打开数据库、初始化表结构，装配仓储与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ExpenseApi, ReconcileApi, ReferenceApi};
use crate::config::AppConfig;
use crate::db::open_and_init;
use crate::engine::orchestrator::PipelineOptions;
use crate::repository::{ProcessingLogRepository, ReferenceRepository, WagonInvoiceRepository};

/// 应用状态
///
/// 所有仓储共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 对账API
    pub reconcile_api: Arc<ReconcileApi>,

    /// 费用匹配API
    pub expense_api: Arc<ExpenseApi>,

    /// 参照表导入API
    pub reference_api: Arc<ReferenceApi>,

    /// 处理日志仓储
    pub log_repo: Arc<ProcessingLogRepository>,

    /// 对账结果仓储
    pub wagon_repo: Arc<WagonInvoiceRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - config: 已加载的应用配置
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 数据库打开或表结构初始化失败
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        let db_path = config.database_path.clone();
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        if let Some(parent) = std::path::Path::new(&db_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("无法创建数据库目录 {}: {}", parent.display(), e))?;
        }

        let conn = open_and_init(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let reference_repo = Arc::new(ReferenceRepository::from_connection(conn.clone()));
        let wagon_repo = Arc::new(WagonInvoiceRepository::from_connection(conn.clone()));
        let log_repo = Arc::new(ProcessingLogRepository::new(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let options = PipelineOptions {
            duplicate_sample_limit: config.duplicate_sample_limit,
            shared_identifier_sample_limit: config.shared_identifier_sample_limit,
        };
        let reconcile_api = Arc::new(ReconcileApi::new(
            reference_repo.clone(),
            wagon_repo.clone(),
            log_repo.clone(),
            &config.stg_file_prefix,
            options,
        ));
        let expense_api = Arc::new(ExpenseApi::new(
            reference_repo.clone(),
            wagon_repo.clone(),
            log_repo.clone(),
        ));
        let reference_api = Arc::new(ReferenceApi::new(
            reference_repo,
            log_repo.clone(),
            config.mapping_strategy,
        ));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            reconcile_api,
            expense_api,
            reference_api,
            log_repo,
            wagon_repo,
        })
    }
}
