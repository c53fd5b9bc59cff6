use toprepos::PoolOptions;
use toprepos::db;
use toprepos::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

/// Apply, roll back, inspect or rebuild the `top100` / `activity` schema.
pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
    pool: &PoolOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url, pool).await?;

    let done = match action {
        MigrateAction::Up => {
            Migrator::up(&db, None).await?;
            "Schema is up to date."
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            "Rolled back the latest migration."
        }
        MigrateAction::Status => {
            Migrator::status(&db).await?;
            "Migration status listed above."
        }
        MigrateAction::Fresh => {
            Migrator::fresh(&db).await?;
            "Dropped all tables and recreated the schema."
        }
    };
    println!("{done}");

    db.close().await?;
    Ok(())
}
