use anyhow::Context;
use hunter::config::HunterConfig;
use hunter::session::Session;
use hunter::{logging, providers, ui};

fn main() -> anyhow::Result<()> {
    let config = HunterConfig::from_env().context("failed to load configuration")?;
    let logging_enabled = logging::init(&config).with_context(|| {
        let path = config.log_file.as_deref().map(|path| path.display().to_string());
        format!("failed to open log file {}", path.unwrap_or_default())
    })?;
    if logging_enabled {
        tracing::info!(provider = config.provider.as_str(), model = %config.model, "starting hunter");
    }

    let gateway =
        providers::gateway_from_config(&config).context("failed to start agent gateway")?;
    let mut session = Session::new(gateway, &config.system_instructions);
    ui::run(&mut session)
}
