//! Alert registry - low-stock alerts keyed by (patient, supply item).
//!
//! Evaluation is called directly by the reconciler after every committed
//! movement, and by [`sweep_low_stock`] as an idempotent batch job. Alerts are
//! never resolved automatically; a human acknowledges them through
//! [`set_active`].

use crate::{
    config::database::ACTIVE_ALERT_INDEX,
    entities::{Alert, AlertKind, Supply, alert, supply},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Outcome of a low-stock sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Items evaluated
    pub scanned: u64,
    /// Alerts opened by this sweep
    pub opened: u64,
}

/// Message stored on a low-stock alert.
#[must_use]
pub fn low_stock_message(item: &supply::Model) -> String {
    format!(
        "Low stock for {}: {}{} left (minimum {}{})",
        item.name, item.current_balance, item.unit, item.minimum_threshold, item.unit
    )
}

/// Currently active low-stock alert for an item, if any.
pub async fn find_active_low_stock<C>(db: &C, supply_id: i64) -> Result<Option<alert::Model>>
where
    C: ConnectionTrait,
{
    Alert::find()
        .filter(alert::Column::SupplyId.eq(supply_id))
        .filter(alert::Column::Kind.eq(AlertKind::LowStock))
        .filter(alert::Column::Active.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Opens a low-stock alert when the item is under its threshold and none is active.
///
/// Returns the alert only when this call created it. The insert runs inside a
/// savepoint: losing a race against the partial unique index on active alerts
/// rolls back just the insert and counts as "already open".
#[instrument(skip(db, item), fields(supply_id = item.id, patient_id = item.patient_id))]
pub async fn evaluate_low_stock<C>(db: &C, item: &supply::Model) -> Result<Option<alert::Model>>
where
    C: ConnectionTrait + TransactionTrait,
{
    if item.current_balance >= item.minimum_threshold {
        return Ok(None);
    }

    if find_active_low_stock(db, item.id).await?.is_some() {
        debug!("Low-stock alert already active");
        return Ok(None);
    }

    open_low_stock_alert(db, item).await
}

/// Inserts an active low-stock alert inside a savepoint.
///
/// A unique violation on the active-alert index rolls back only the savepoint
/// and yields `None`; the caller's transaction stays usable.
async fn open_low_stock_alert<C>(db: &C, item: &supply::Model) -> Result<Option<alert::Model>>
where
    C: ConnectionTrait + TransactionTrait,
{
    let savepoint = db.begin().await?;
    let insert = alert::ActiveModel {
        patient_id: Set(item.patient_id),
        supply_id: Set(item.id),
        kind: Set(AlertKind::LowStock),
        message: Set(low_stock_message(item)),
        active: Set(true),
        created_at: Set(chrono::Utc::now()),
        resolved_at: Set(None),
        ..Default::default()
    }
    .insert(&savepoint)
    .await;

    match insert {
        Ok(created) => {
            savepoint.commit().await?;
            info!(alert_id = created.id, "Low-stock alert opened");
            Ok(Some(created))
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            debug!(index = ACTIVE_ALERT_INDEX, "Concurrent evaluation opened the alert first");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Evaluates every supply item (optionally only one patient's) as if a
/// movement had just been committed on it.
pub async fn sweep_low_stock(db: &DatabaseConnection, patient_id: Option<i64>) -> Result<SweepReport> {
    let mut query = Supply::find().order_by_asc(supply::Column::Id);
    if let Some(patient_id) = patient_id {
        query = query.filter(supply::Column::PatientId.eq(patient_id));
    }
    let items = query.all(db).await?;

    let mut report = SweepReport::default();
    for item in &items {
        report.scanned += 1;
        if evaluate_low_stock(db, item).await?.is_some() {
            report.opened += 1;
        }
    }

    info!(scanned = report.scanned, opened = report.opened, "Low-stock sweep finished");
    Ok(report)
}

/// Parses the `active` list filter: `true/1/yes/y` or `false/0/no/n`, any case.
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Lists a patient's alerts, newest first, optionally filtered by state.
pub async fn list_alerts(
    db: &DatabaseConnection,
    patient_id: i64,
    active: Option<bool>,
) -> Result<Vec<alert::Model>> {
    let mut query = Alert::find().filter(alert::Column::PatientId.eq(patient_id));
    if let Some(active) = active {
        query = query.filter(alert::Column::Active.eq(active));
    }
    query
        .order_by_desc(alert::Column::CreatedAt)
        .order_by_desc(alert::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Acknowledges (`active = false`) or re-opens an alert.
///
/// - The alert must belong to the patient, otherwise `NotFound`.
/// - Closing stamps `resolved_at` only if it was never stamped.
/// - Re-opening keeps `resolved_at` as the marker of the last close.
/// - Re-opening while another low-stock alert is active for the same item is a
///   validation error.
pub async fn set_active(
    db: &DatabaseConnection,
    patient_id: i64,
    alert_id: i64,
    active: bool,
) -> Result<alert::Model> {
    let existing = Alert::find_by_id(alert_id)
        .filter(alert::Column::PatientId.eq(patient_id))
        .one(db)
        .await?
        .ok_or(Error::not_found("alert"))?;

    if existing.active == active {
        return Ok(existing);
    }

    let stamp_resolved = !active && existing.resolved_at.is_none();
    let mut model: alert::ActiveModel = existing.into();
    model.active = Set(active);
    if stamp_resolved {
        model.resolved_at = Set(Some(chrono::Utc::now()));
    }

    match model.update(db).await {
        Ok(updated) => {
            info!(alert_id, active, "Alert state changed");
            Ok(updated)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Err(
            Error::validation("another low-stock alert is already active for this supply"),
        ),
        Err(err) => Err(err.into()),
    }
}
