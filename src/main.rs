//! Session client binary entry point.

use std::sync::Arc;

use tracing::info;

use dataproc_spark_connect::api::HttpSessionController;
use dataproc_spark_connect::proxy::SessionProxy;
use dataproc_spark_connect::{
    auth, cli, config, console, logging, ArtifactManifest, ClientConfig, SessionConfig,
    SessionManager, SessionProbe,
};

#[tokio::main]
async fn main() -> dataproc_spark_connect::Result<()> {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("try 'dataproc-spark-connect --help'");
            std::process::exit(2);
        }
    };

    if args.help {
        cli::print_help();
        return Ok(());
    }
    if args.version {
        cli::print_version();
        return Ok(());
    }

    match args.log_level.as_deref() {
        Some(level) => logging::init_with(&format!("dataproc_spark_connect={level}")),
        None => logging::init(),
    }

    let mut client_config = ClientConfig::from_env()?;
    client_config.apply_args(&args)?;
    client_config.validate()?;

    let tokens = auth::default_provider(&config::process_env);
    let controller = Arc::new(HttpSessionController::new(
        &client_config.endpoint()?,
        tokens,
    ));
    let manager = Arc::new(SessionManager::new(controller, client_config.clone()));

    let mut spec = SessionConfig::new();
    if let Some(ref version) = args.runtime_version {
        spec = spec.with_runtime_version(version.as_str());
    }
    if let Some(ref template) = args.session_template {
        spec = spec.with_session_template(template.as_str());
    }
    for (key, value) in &args.labels {
        spec = spec.with_label(key.as_str(), value.as_str())?;
    }

    let session = manager.get_or_create(&spec).await?;
    info!("session {} is active", session.id);

    if !args.artifacts.is_empty() {
        let manifest = ArtifactManifest::new(&args.artifacts)?;
        let path = manifest.stage(&session.uuid, &std::env::temp_dir())?;
        info!("staged dependency manifest at {}", path.display());
    }

    let probe: Arc<dyn SessionProbe> = manager.clone();
    let proxy = SessionProxy::start(&session.endpoint, probe).await?;
    info!("Spark Connect available at {}", proxy.connect_url());

    if let (Some(project), Some(region)) = (
        client_config.project_id.as_deref(),
        client_config.region.as_deref(),
    ) {
        info!(
            "session: {}",
            console::session_url(project, region, session.id.as_str())
        );
        info!(
            "Spark UI: {}",
            console::spark_ui_url(project, region, session.id.as_str())
        );
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    proxy.stop();

    if client_config.terminate_at_exit {
        manager.terminate().await?;
        info!("session terminated");
    }

    Ok(())
}
