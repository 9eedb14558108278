// ==========================================
// 车皮路由对账系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、按键修改
// 存储: JSON 文件（默认 config.json）
// 规则: 缺失的键用默认值补齐；文件不存在时写出默认配置
// ==========================================

use crate::domain::types::MappingStrategy;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// 默认配置文件名
pub const CONFIG_FILE: &str = "config.json";

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "WAGON_ROUTE_DB_PATH";

// ==========================================
// ConfigError - 配置错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件格式错误: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("未知配置项: {0}")]
    UnknownKey(String),

    #[error("配置值无效 (key={key}): {message}")]
    InvalidValue { key: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 目录
    pub const BASE_DIRECTORY: &str = "base_directory";
    pub const OUTPUT_DIRECTORY: &str = "output_directory";
    pub const DATABASE_PATH: &str = "database_path";

    // 车皮动态
    pub const STG_FOLDER: &str = "stg_folder";
    pub const STG_FILE_PREFIX: &str = "stg_file_prefix";
    pub const EXISTING_DATA_PATH: &str = "existing_data_path";
    pub const ROUTE_ID_PATH: &str = "route_id_path";

    // 参照表源文件
    pub const ZNP_PATH: &str = "znp_path";
    pub const EXCEPTIONS_PATH: &str = "exceptions_path";
    pub const OVERRIDES_PATH: &str = "overrides_path";
    pub const ACTIVE_PATH: &str = "active_path";
    pub const MATRIX_PATH: &str = "matrix_path";

    // 费用
    pub const EXPENSE_FOLDER: &str = "expense_folder";

    // 引擎参数
    pub const MAPPING_STRATEGY: &str = "mapping_strategy";
    pub const DUPLICATE_SAMPLE_LIMIT: &str = "duplicate_sample_limit";
    pub const SHARED_IDENTIFIER_SAMPLE_LIMIT: &str = "shared_identifier_sample_limit";
}

// ==========================================
// AppConfig - 应用配置
// ==========================================
// 路径类配置项为空字符串表示"未配置"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_directory: String,
    pub output_directory: String,
    pub database_path: String,

    pub stg_folder: String,
    pub stg_file_prefix: String,
    pub existing_data_path: String,
    pub route_id_path: String,

    pub znp_path: String,
    pub exceptions_path: String,
    pub overrides_path: String,
    pub active_path: String,
    pub matrix_path: String,

    pub expense_folder: String,

    pub mapping_strategy: MappingStrategy,
    pub duplicate_sample_limit: usize,
    pub shared_identifier_sample_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_directory: "./data".to_string(),
            output_directory: "./output".to_string(),
            database_path: get_default_db_path(),
            stg_folder: String::new(),
            stg_file_prefix: "STGDaily_".to_string(),
            existing_data_path: String::new(),
            route_id_path: String::new(),
            znp_path: String::new(),
            exceptions_path: String::new(),
            overrides_path: String::new(),
            active_path: String::new(),
            matrix_path: String::new(),
            expense_folder: String::new(),
            mapping_strategy: MappingStrategy::default(),
            duplicate_sample_limit: 3,
            shared_identifier_sample_limit: 5,
        }
    }
}

impl AppConfig {
    /// 日报目录（未配置时取 base_directory）
    pub fn stg_folder_path(&self) -> PathBuf {
        non_empty_path(&self.stg_folder).unwrap_or_else(|| PathBuf::from(&self.base_directory))
    }

    /// 费用目录（未配置时取 base_directory/expenses）
    pub fn expense_folder_path(&self) -> PathBuf {
        non_empty_path(&self.expense_folder)
            .unwrap_or_else(|| Path::new(&self.base_directory).join("expenses"))
    }

    pub fn existing_data_file(&self) -> Option<PathBuf> {
        non_empty_path(&self.existing_data_path)
    }

    pub fn route_id_file(&self) -> Option<PathBuf> {
        non_empty_path(&self.route_id_path)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_directory)
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigManager {
    /// 加载配置；文件不存在时写出默认配置
    ///
    /// # 参数
    /// - path: 配置文件路径
    ///
    /// # 返回
    /// - Ok(ConfigManager): 缺失的键已按默认值补齐
    /// - Err: 文件读取失败或 JSON 格式错误
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let config: AppConfig = serde_json::from_str(&raw)?;
            info!(path = %path.display(), "配置已加载");
            return Ok(Self { path, config });
        }

        info!(path = %path.display(), "配置文件不存在，写出默认配置");
        let manager = Self {
            path,
            config: AppConfig::default(),
        };
        manager.save()?;
        Ok(manager)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保存配置并创建配置中的目录
    pub fn save(&self) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.path, json)?;

        std::fs::create_dir_all(&self.config.base_directory)?;
        std::fs::create_dir_all(&self.config.output_directory)?;
        info!(path = %self.path.display(), "配置已保存");
        Ok(())
    }

    /// 按键读取配置值（字符串形式）
    pub fn get_value(&self, key: &str) -> ConfigResult<String> {
        let value = serde_json::to_value(&self.config)?;
        match value.get(key) {
            Some(JsonValue::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    /// 按键修改配置并保存
    ///
    /// 数值型配置项按数值解析，其余按字符串写入
    pub fn set_value(&mut self, key: &str, raw: &str) -> ConfigResult<()> {
        let mut value = serde_json::to_value(&self.config)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let new_value = match object.get(key) {
            None => return Err(ConfigError::UnknownKey(key.to_string())),
            Some(JsonValue::Number(_)) => {
                let n: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("需要非负整数: '{}'", raw),
                })?;
                JsonValue::from(n)
            }
            Some(_) => JsonValue::String(raw.trim().to_string()),
        };
        object.insert(key.to_string(), new_value);

        self.config = serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.save()
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 WAGON_ROUTE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./wagon_route_recon.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("wagon-route-recon");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("wagon_route_recon.db");
        }
    }
    path.to_string_lossy().to_string()
}
