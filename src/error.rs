use thiserror::Error;

/// 统一结果类型
pub type Result<T> = std::result::Result<T, IntakeError>;

/// 入库管线错误分类
///
/// 只有这三类会跨越管线边界: 文件不存在 / 提取失败 / 持久化失败。
/// 日期降级和未匹配行不是错误, 记录审计日志后继续。
#[derive(Error, Debug)]
pub enum IntakeError {
    /// 文件在文件存储中不可访问 (404)
    #[error("file {0} not accessible in the file store")]
    FileNotFound(String),

    /// AI 提取失败或超时 (422)
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// 数据库错误, 整个工作单元回滚 (500)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 启动配置缺失
    #[error("configuration error: {0}")]
    Config(String),
}
