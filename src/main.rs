use axum::{routing::{get, post}, Router};
use invoice_intake_rust::clients::{DriveFileStore, GeminiExtractor};
use invoice_intake_rust::{api, create_pool, AppConfig, IntakeOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置 (INTAKE_TENANT 必填)
    let config = AppConfig::from_env()?;
    info!(
        "Starting server for tenant {} on {}:{}",
        config.intake.tenant, config.server.host, config.server.port
    );

    // 创建数据库连接池
    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    // 外部协作方: 构建一次, 全程注入复用
    let files = Arc::new(DriveFileStore::new(&config.file_store));
    let extractor = Arc::new(GeminiExtractor::new(&config.extractor));

    let orchestrator = Arc::new(IntakeOrchestrator::new(
        pool,
        files,
        extractor,
        config.intake.tenant.clone(),
        Duration::from_secs(config.extractor.timeout_secs),
    ));

    // 构建路由
    let app = Router::new()
        .route("/", get(api::service_status))
        .route("/health", get(api::health_check))
        .route("/api/intake/process-file", post(api::process_file))
        .with_state(orchestrator)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/intake/process-file - invoice intake pipeline");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
