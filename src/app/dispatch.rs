use crate::Config;
use crate::app::status::render_status;
use crate::cli::Commands;
use crate::retention::SnapshotStore;
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run => crate::daemon::run(Arc::new(config)).await,
        Commands::Status => {
            let store = SnapshotStore::new(config.state_file_path());
            let state = store.load().context("failed to read retention snapshot")?;
            println!("{}", render_status(&config, store.path(), &state));
            Ok(())
        }
        Commands::ConfigPath => {
            println!("{}", config.config_path.display());
            Ok(())
        }
    }
}
