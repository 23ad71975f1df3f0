use std::path::Path;

use crate::commands::common::{open_service, resolve_item};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let item = resolve_item(&service, id).await?;

    service.delete_item(&item.id).await?;
    println!("{}", item.id);
    Ok(())
}
