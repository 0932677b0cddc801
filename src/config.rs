use crate::error::IntakeError;
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub file_store: FileStoreConfig,
    pub extractor: ExtractorConfig,
    pub intake: IntakeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// 文件存储 (Google Drive) 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    pub base_url: String,
    pub access_token: String,
}

/// AI 提取服务 (Gemini) 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// 提取调用超时, 超时按可恢复的单请求失败处理
    pub timeout_secs: u64,
}

/// 入库管线配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// 默认租户, 必填 — 核心逻辑里不允许租户字面量
    pub tenant: String,
}

impl AppConfig {
    /// 从环境变量加载配置, INTAKE_TENANT 缺失时启动失败
    pub fn from_env() -> Result<Self, IntakeError> {
        let tenant = std::env::var("INTAKE_TENANT")
            .map_err(|_| IntakeError::Config("INTAKE_TENANT is required".to_string()))?;

        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/invoice_intake".to_string()),
            },
            file_store: FileStoreConfig {
                base_url: std::env::var("DRIVE_BASE_URL")
                    .unwrap_or_else(|_| "https://www.googleapis.com/drive/v3".to_string()),
                access_token: std::env::var("DRIVE_ACCESS_TOKEN").unwrap_or_default(),
            },
            extractor: ExtractorConfig {
                base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }),
                api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
                model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
                timeout_secs: std::env::var("EXTRACT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            },
            intake: IntakeConfig { tenant },
        })
    }
}
