use clap::Parser;
use freelancelot::cli::{Cli, execute_command, init_logger_from_settings, load_and_merge_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_and_merge_config(&cli)?;
    init_logger_from_settings(&settings)?;

    tracing::info!(
        version = freelancelot::pkg_version(),
        command = ?cli.selected_command(),
        "Starting {}",
        settings.application.name
    );

    execute_command(&cli, settings).await?;

    Ok(())
}
