//! Shared test utilities for `DiaFlow`.
//!
//! Helpers for setting up in-memory databases and creating patients, supply
//! items and kits with sensible defaults.

use crate::{
    core::{
        kit::{self, ElementInput, NewKit},
        patient,
        supply::{self, NewSupply},
    },
    entities::{self, SupplyCategory},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Onboards a test patient whose display name equals the account id.
pub async fn create_test_patient(
    db: &DatabaseConnection,
    account_id: &str,
) -> Result<entities::patient::Model> {
    patient::onboard(db, account_id, "").await
}

/// Supply input with sensible defaults.
///
/// # Defaults
/// * `category`: `other`
/// * `unit`: `None` (stored as `"u"`)
/// * `expires_on`: `None`
#[must_use]
pub fn new_supply(name: &str, opening_balance: i64, minimum_threshold: i64) -> NewSupply {
    NewSupply {
        name: name.to_string(),
        category: SupplyCategory::Other,
        minimum_threshold,
        unit: None,
        expires_on: None,
        opening_balance,
    }
}

/// Creates a supply item with the given opening balance and threshold.
pub async fn create_test_supply(
    db: &DatabaseConnection,
    patient_id: i64,
    name: &str,
    opening_balance: i64,
    minimum_threshold: i64,
) -> Result<entities::supply::Model> {
    supply::create_supply(db, patient_id, new_supply(name, opening_balance, minimum_threshold)).await
}

/// Element input with an explicit quantity and the default unit.
#[must_use]
pub fn element(label: &str, required_quantity: i64) -> ElementInput {
    ElementInput {
        label: label.to_string(),
        required_quantity: Some(required_quantity),
        unit: None,
    }
}

/// Creates an active kit and sets its elements.
pub async fn create_test_kit(
    db: &DatabaseConnection,
    patient_id: i64,
    name: &str,
    elements: Vec<ElementInput>,
) -> Result<entities::kit::Model> {
    let created = kit::create_kit(
        db,
        patient_id,
        NewKit {
            name: name.to_string(),
            description: String::new(),
        },
    )
    .await?;
    kit::replace_elements(db, patient_id, created.id, elements).await?;
    Ok(created)
}

/// Sets up a database with one onboarded patient (`"test-account"`).
/// Returns (db, patient) for common test scenarios.
pub async fn setup_with_patient() -> Result<(DatabaseConnection, entities::patient::Model)> {
    let db = setup_test_db().await?;
    let patient = create_test_patient(&db, "test-account").await?;
    Ok((db, patient))
}

/// Sets up a patient with the "Viaje" kit: Tiras x2 and Agujas x1.
/// Returns (db, patient, kit) for verification tests.
pub async fn setup_with_kit() -> Result<(
    DatabaseConnection,
    entities::patient::Model,
    entities::kit::Model,
)> {
    let (db, patient) = setup_with_patient().await?;
    let kit = create_test_kit(
        &db,
        patient.id,
        "Viaje",
        vec![element("Tiras", 2), element("Agujas", 1)],
    )
    .await?;
    Ok((db, patient, kit))
}
