//! Database configuration module.
//!
//! Handles connecting through `SeaORM` and creating all tables from the entity
//! definitions with `Schema::create_table_from_entity`, followed by the unique
//! indexes the stock and kit logic relies on:
//!
//! - `kit_elements (kit_id, label)` keeps labels unique inside a kit;
//! - `alerts (supply_id, kind) WHERE active` is the serialization point that
//!   stops two concurrent evaluations from opening duplicate low-stock alerts.

use crate::entities::{Alert, Kit, KitElement, Movement, Patient, Supply, Verification};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Name of the partial unique index guarding active low-stock alerts.
pub const ACTIVE_ALERT_INDEX: &str = "ux_alerts_active_per_supply";

/// Establishes a connection to the configured database.
///
/// `SQLite` and `PostgreSQL` URLs are both accepted; the driver is chosen by
/// the URL scheme.
#[instrument(skip_all)]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    let db = Database::connect(database_url).await?;
    info!("Database connection established");
    Ok(db)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes. Safe to run on every start.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Parents before children so foreign keys resolve
    create_table(db, &schema, Patient).await?;
    create_table(db, &schema, Supply).await?;
    create_table(db, &schema, Movement).await?;
    create_table(db, &schema, Alert).await?;
    create_table(db, &schema, Kit).await?;
    create_table(db, &schema, KitElement).await?;
    create_table(db, &schema, Verification).await?;

    let element_label_index = Index::create()
        .name("ux_kit_elements_kit_label")
        .table(KitElement)
        .col(crate::entities::KitElementColumn::KitId)
        .col(crate::entities::KitElementColumn::Label)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&element_label_index)).await?;

    db.execute_unprepared(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {ACTIVE_ALERT_INDEX} ON alerts (supply_id, kind) WHERE active"
    ))
    .await?;

    Ok(())
}

/// Connects and makes sure the schema exists.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    let db = create_connection(database_url).await?;
    info!("Ensuring tables are created...");
    create_tables(&db).await?;
    Ok(db)
}

/// Runs a trivial query to check the database is reachable.
pub async fn ping(db: &DatabaseConnection) -> bool {
    db.ping().await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        alert::Model as AlertModel, kit::Model as KitModel, movement::Model as MovementModel,
        supply::Model as SupplyModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<SupplyModel> = Supply::find().limit(1).all(&db).await?;
        let _: Vec<MovementModel> = Movement::find().limit(1).all(&db).await?;
        let _: Vec<AlertModel> = Alert::find().limit(1).all(&db).await?;
        let _: Vec<KitModel> = Kit::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        assert!(ping(&db).await);
        Ok(())
    }
}
