use std::path::Path;

use crate::commands::common::{
    build_engine, build_remote, normalize_identifier, open_local, sync_outcome_line,
};
use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_delete(
    collection: &str,
    id: &str,
    config: &CliConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let collection = normalize_identifier(collection, CliError::EmptyCollection)?;
    let id = normalize_identifier(id, CliError::EmptyRecordId)?;

    let remote = build_remote(config)?;
    let local = open_local(db_path).await?;
    let engine = build_engine(config, local, remote);

    let result = engine.delete_record(&collection, &id).await;
    sync_outcome_line("Delete", &result)?;
    println!("{collection}/{id}");
    Ok(())
}
