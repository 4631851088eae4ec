use std::path::Path;

use crate::commands::common::{build_engine, build_remote, open_local, sync_outcome_line};
use crate::config::CliConfig;
use crate::error::CliError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncDirection {
    Push,
    Pull,
    Full,
}

impl SyncDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Push => "Push",
            Self::Pull => "Pull",
            Self::Full => "Sync",
        }
    }
}

pub async fn run_sync(
    direction: SyncDirection,
    config: &CliConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let remote = build_remote(config)?;
    let local = open_local(db_path).await?;
    let engine = build_engine(config, local, remote);

    let result = match direction {
        SyncDirection::Push => engine.push().await,
        SyncDirection::Pull => engine.pull().await,
        SyncDirection::Full => engine.full_sync().await,
    };
    println!("{}", sync_outcome_line(direction.label(), &result)?);
    Ok(())
}
