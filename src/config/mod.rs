// ==========================================
// 车皮路由对账系统 - 配置层
// ==========================================
// 职责: 系统配置管理（目录、参照表源文件、引擎参数）
// 存储: config.json
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, get_default_db_path, AppConfig, ConfigError, ConfigManager, ConfigResult,
    CONFIG_FILE,
};
