//! Stock reconciler - the only writer of `supplies.current_balance`.
//!
//! A movement is committed in one transaction that
//!
//! 1. increments the balance with a single conditional
//!    `UPDATE supplies SET current_balance = current_balance + ?
//!    WHERE id = ? AND current_balance >= -?`, so the non-negative check and
//!    the increment are one atomic statement and concurrent movements on the
//!    same row serialize on its row lock;
//! 2. appends the movement row;
//! 3. re-reads the item and runs low-stock evaluation.
//!
//! Any failure drops the transaction, so neither the movement nor the balance
//! change survives.

use crate::{
    core::alert,
    entities::{MovementReason, Supply, alert as alert_entity, movement, supply},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Result of a committed movement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMovement {
    /// The appended ledger row
    pub movement: movement::Model,
    /// Balance after the movement
    pub new_balance: i64,
    /// Low-stock alert opened by this movement, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<alert_entity::Model>,
}

/// Applies a signed quantity to a supply item.
///
/// Fails with a validation error, and changes nothing, when the resulting
/// balance would be negative.
#[instrument(skip(db, supply, note), fields(supply_id = supply.id))]
pub async fn apply_movement<C>(
    db: &C,
    supply: &supply::Model,
    quantity: i64,
    reason: MovementReason,
    note: String,
) -> Result<AppliedMovement>
where
    C: ConnectionTrait + TransactionTrait,
{
    // Outbound movements need balance >= -q, inbound ones balance <= MAX - q
    let guard = if quantity < 0 {
        let floor = quantity
            .checked_neg()
            .ok_or_else(|| Error::validation("quantity out of range"))?;
        supply::Column::CurrentBalance.gte(floor)
    } else {
        supply::Column::CurrentBalance.lte(i64::MAX - quantity)
    };
    if supply.current_balance.checked_add(quantity).is_none() {
        return Err(Error::validation("quantity out of range"));
    }

    let txn = db.begin().await?;

    let updated = Supply::update_many()
        .col_expr(
            supply::Column::CurrentBalance,
            Expr::col(supply::Column::CurrentBalance).add(quantity),
        )
        .filter(supply::Column::Id.eq(supply.id))
        .filter(guard)
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        // Either the row is gone or the guard rejected the new balance
        let exists = Supply::find_by_id(supply.id).one(&txn).await?;
        return match exists {
            None => Err(Error::not_found("supply")),
            Some(current) if quantity < 0 => {
                debug!(
                    balance = current.current_balance,
                    "Movement rejected: negative stock"
                );
                Err(Error::validation("negative stock"))
            }
            Some(_) => Err(Error::validation("quantity out of range")),
        };
    }

    let movement = movement::ActiveModel {
        supply_id: Set(supply.id),
        quantity: Set(quantity),
        reason: Set(reason),
        note: Set(note),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let current = Supply::find_by_id(supply.id)
        .one(&txn)
        .await?
        .ok_or(Error::not_found("supply"))?;
    let alert = alert::evaluate_low_stock(&txn, &current).await?;

    txn.commit().await?;

    info!(
        movement_id = movement.id,
        quantity,
        new_balance = current.current_balance,
        "Movement committed"
    );
    Ok(AppliedMovement {
        movement,
        new_balance: current.current_balance,
        alert,
    })
}
