use anyhow::Context;
use clap::Parser;
use nosql_broker::utils::{logger, validation::Validate};
use nosql_broker::{api, security, BrokerError, CliArgs, DockerCli, ServiceBroker};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting nosql-broker");

    let config = match args.resolve().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => exit_on_startup_error(e),
    };
    if args.verbose {
        tracing::debug!("Broker config: {:?}", config);
    }

    // 驗證過的配置一定有兩個憑證路徑
    let (Some(cert_path), Some(key_path)) = (config.cert_path(), config.key_path()) else {
        anyhow::bail!("TLS credential paths are missing after validation");
    };

    let trust = match security::establish(cert_path, key_path) {
        Ok(trust) => trust,
        Err(e) => exit_on_startup_error(e.into()),
    };
    let (tls_config, report) = match trust.server_config() {
        Ok(built) => built,
        Err(e) => exit_on_startup_error(e.into()),
    };

    tracing::info!("🔒 Cipher suites enabled: {}", report.enabled.join(", "));
    if !report.unavailable.is_empty() {
        tracing::warn!(
            "⚠️ Cipher suites not offered by the TLS provider: {}",
            report.unavailable.join(", ")
        );
    }

    let runtime = Arc::new(DockerCli::from_config(&config.runtime));
    let broker = Arc::new(ServiceBroker::from_config(runtime, &config));
    let app = api::create_router(broker);

    let port = config.server.port();
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    api::serve(listener, Arc::new(tls_config), app, shutdown_signal())
        .await
        .context("broker server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn exit_on_startup_error(e: BrokerError) -> ! {
    tracing::error!("❌ Broker cannot start: {}", e);
    eprintln!("❌ {}", e);

    // 設定錯誤與憑證政策錯誤使用不同的退出碼
    let exit_code = match &e {
        BrokerError::Trust(_) => 3,
        _ if e.is_fatal_at_startup() => 1,
        _ => 2,
    };
    std::process::exit(exit_code);
}
