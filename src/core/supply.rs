//! Supply ledger store - supply items and their movement history.
//!
//! Items are always created with a zero balance; any opening stock is
//! committed through [`crate::core::stock::apply_movement`] as an adjustment so
//! that `current_balance` equals the sum of the movement ledger from the first
//! row on. Nothing in this module writes the balance column.

use crate::{
    core::{alert, stock},
    entities::{Alert, Movement, MovementReason, Supply, SupplyCategory, movement, supply},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Unit used when none is given.
pub const DEFAULT_UNIT: &str = "u";

/// Note attached to the movement that records an item's opening stock.
pub const OPENING_BALANCE_NOTE: &str = "opening balance";

/// Input for creating a supply item.
#[derive(Debug, Clone)]
pub struct NewSupply {
    /// Display name
    pub name: String,
    /// Consumable category
    pub category: SupplyCategory,
    /// Low-stock threshold (>= 0)
    pub minimum_threshold: i64,
    /// Unit label, defaults to [`DEFAULT_UNIT`]
    pub unit: Option<String>,
    /// Optional expiry date
    pub expires_on: Option<Date>,
    /// Stock on hand at creation (>= 0)
    pub opening_balance: i64,
}

/// Editable supply attributes. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SupplyChanges {
    /// New display name
    pub name: Option<String>,
    /// New category
    pub category: Option<SupplyCategory>,
    /// New threshold
    pub minimum_threshold: Option<i64>,
    /// New unit label
    pub unit: Option<String>,
    /// New expiry; `Some(None)` clears it
    pub expires_on: Option<Option<Date>>,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("supply name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_threshold(threshold: i64) -> Result<i64> {
    if threshold < 0 {
        return Err(Error::validation("minimum threshold must be >= 0"));
    }
    Ok(threshold)
}

fn normalize_unit(unit: Option<String>) -> String {
    unit.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string())
}

/// Creates a supply item for a patient.
///
/// The row and its opening-balance movement are committed together; the
/// low-stock evaluation runs before commit so an item created under its
/// threshold starts with an active alert.
pub async fn create_supply(
    db: &DatabaseConnection,
    patient_id: i64,
    new: NewSupply,
) -> Result<supply::Model> {
    let name = validate_name(&new.name)?;
    let minimum_threshold = validate_threshold(new.minimum_threshold)?;
    if new.opening_balance < 0 {
        return Err(Error::validation("opening balance must be >= 0"));
    }

    let txn = db.begin().await?;

    let created = supply::ActiveModel {
        patient_id: Set(patient_id),
        name: Set(name),
        category: Set(new.category),
        current_balance: Set(0),
        minimum_threshold: Set(minimum_threshold),
        unit: Set(normalize_unit(new.unit)),
        expires_on: Set(new.expires_on),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if new.opening_balance > 0 {
        stock::apply_movement(
            &txn,
            &created,
            new.opening_balance,
            MovementReason::Adjustment,
            OPENING_BALANCE_NOTE.to_string(),
        )
        .await?;
    } else {
        alert::evaluate_low_stock(&txn, &created).await?;
    }

    let model = get_supply_by_id(&txn, created.id)
        .await?
        .ok_or(Error::not_found("supply"))?;
    txn.commit().await?;

    info!(
        supply_id = model.id,
        patient_id,
        balance = model.current_balance,
        "Supply created"
    );
    Ok(model)
}

/// Finds a supply item by ID without any ownership check.
pub async fn get_supply_by_id<C>(db: &C, supply_id: i64) -> Result<Option<supply::Model>>
where
    C: ConnectionTrait,
{
    Supply::find_by_id(supply_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a supply item owned by the patient; anything else is `NotFound`.
pub async fn get_owned<C>(db: &C, patient_id: i64, supply_id: i64) -> Result<supply::Model>
where
    C: ConnectionTrait,
{
    Supply::find_by_id(supply_id)
        .filter(supply::Column::PatientId.eq(patient_id))
        .one(db)
        .await?
        .ok_or(Error::not_found("supply"))
}

/// Lists a patient's supply items in creation order.
pub async fn list_by_patient(db: &DatabaseConnection, patient_id: i64) -> Result<Vec<supply::Model>> {
    Supply::find()
        .filter(supply::Column::PatientId.eq(patient_id))
        .order_by_asc(supply::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Movement history of an item, most recent first.
pub async fn list_movements<C>(db: &C, supply_id: i64) -> Result<Vec<movement::Model>>
where
    C: ConnectionTrait,
{
    Movement::find()
        .filter(movement::Column::SupplyId.eq(supply_id))
        .order_by_desc(movement::Column::CreatedAt)
        .order_by_desc(movement::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of all committed movement quantities for an item.
pub async fn ledger_total<C>(db: &C, supply_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(list_movements(db, supply_id)
        .await?
        .iter()
        .map(|m| m.quantity)
        .sum())
}

/// Edits descriptive attributes of an item. The balance is never touched here.
///
/// A threshold change re-runs low-stock evaluation in the same transaction.
pub async fn update_supply(
    db: &DatabaseConnection,
    patient_id: i64,
    supply_id: i64,
    changes: SupplyChanges,
) -> Result<supply::Model> {
    let txn = db.begin().await?;
    let existing = get_owned(&txn, patient_id, supply_id).await?;

    let mut active: supply::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(validate_name(&name)?);
    }
    if let Some(category) = changes.category {
        active.category = Set(category);
    }
    if let Some(threshold) = changes.minimum_threshold {
        active.minimum_threshold = Set(validate_threshold(threshold)?);
    }
    if let Some(unit) = changes.unit {
        active.unit = Set(normalize_unit(Some(unit)));
    }
    if let Some(expires_on) = changes.expires_on {
        active.expires_on = Set(expires_on);
    }

    let updated = active.update(&txn).await?;
    alert::evaluate_low_stock(&txn, &updated).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Deletes an item together with its movements and alerts.
pub async fn delete_supply(db: &DatabaseConnection, patient_id: i64, supply_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let existing = get_owned(&txn, patient_id, supply_id).await?;

    Alert::delete_many()
        .filter(crate::entities::alert::Column::SupplyId.eq(existing.id))
        .exec(&txn)
        .await?;
    Movement::delete_many()
        .filter(movement::Column::SupplyId.eq(existing.id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!(supply_id, patient_id, "Supply deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::alert::list_alerts;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_supply_validation_touches_nothing() -> Result<()> {
        // No query results configured: any database access would fail the test
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut new = new_supply("Tiras", 0, 2);
        new.name = "   ".to_string();
        let result = create_supply(&db, 1, new).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_supply(&db, 1, new_supply("Tiras", 0, -1)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_supply(&db, 1, new_supply("Tiras", -3, 2)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_opening_balance_is_a_ledger_movement() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;

        let created = create_supply(&db, patient.id, new_supply("Lancetas", 7, 2)).await?;
        assert_eq!(created.current_balance, 7);
        assert_eq!(created.unit, DEFAULT_UNIT);

        let movements = list_movements(&db, created.id).await?;
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, 7);
        assert_eq!(movements[0].reason, MovementReason::Adjustment);
        assert_eq!(movements[0].note, OPENING_BALANCE_NOTE);
        assert_eq!(ledger_total(&db, created.id).await?, created.current_balance);

        Ok(())
    }

    #[tokio::test]
    async fn test_zero_opening_balance_records_no_movement() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let created = create_supply(&db, patient.id, new_supply("Agujas", 0, 0)).await?;
        assert!(list_movements(&db, created.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_created_under_threshold_opens_alert() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let created = create_supply(&db, patient.id, new_supply("Sensor", 0, 1)).await?;

        let alerts = list_alerts(&db, patient.id, Some(true)).await?;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].supply_id, created.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_owned_hides_other_patients_items() -> Result<()> {
        let (db, owner) = setup_with_patient().await?;
        let other = create_test_patient(&db, "other").await?;
        let item = create_test_supply(&db, owner.id, "Tiras", 3, 1).await?;

        assert!(get_owned(&db, owner.id, item.id).await.is_ok());
        let result = get_owned(&db, other.id, item.id).await;
        assert!(matches!(result, Err(Error::NotFound { resource: "supply" })));
        assert!(list_by_patient(&db, other.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_never_changes_balance() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let item = create_test_supply(&db, patient.id, "Tiras", 5, 1).await?;

        let updated = update_supply(
            &db,
            patient.id,
            item.id,
            SupplyChanges {
                name: Some("Tiras Accu-Chek".to_string()),
                unit: Some("strip".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.name, "Tiras Accu-Chek");
        assert_eq!(updated.unit, "strip");
        assert_eq!(updated.current_balance, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_raising_threshold_opens_alert() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let item = create_test_supply(&db, patient.id, "Insulina", 4, 2).await?;
        assert!(list_alerts(&db, patient.id, Some(true)).await?.is_empty());

        update_supply(
            &db,
            patient.id,
            item.id,
            SupplyChanges {
                minimum_threshold: Some(10),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(list_alerts(&db, patient.id, Some(true)).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_supply_removes_history() -> Result<()> {
        let (db, patient) = setup_with_patient().await?;
        let item = create_test_supply(&db, patient.id, "Tiras", 1, 5).await?;

        delete_supply(&db, patient.id, item.id).await?;

        assert!(get_supply_by_id(&db, item.id).await?.is_none());
        assert!(list_movements(&db, item.id).await?.is_empty());
        assert!(list_alerts(&db, patient.id, None).await?.is_empty());

        let again = delete_supply(&db, patient.id, item.id).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
        Ok(())
    }
}
