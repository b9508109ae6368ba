//! Patient onboarding.
//!
//! The identity layer calls [`onboard`] once when an account is created.
//! Request handlers only ever look patients up; they never create them.

use crate::{
    entities::{Patient, patient},
    errors::{Error, Result},
};
use sea_orm::{Set, SqlErr, prelude::*};
use tracing::info;

/// Finds the patient linked to an account identity.
pub async fn find_by_account<C>(db: &C, account_id: &str) -> Result<Option<patient::Model>>
where
    C: ConnectionTrait,
{
    Patient::find()
        .filter(patient::Column::AccountId.eq(account_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates the patient for an account, or returns the existing one.
///
/// Repeated calls for the same account never modify the stored patient. A
/// concurrent onboarding of the same account resolves to the row that won the
/// unique constraint on `account_id`.
pub async fn onboard<C>(db: &C, account_id: &str, display_name: &str) -> Result<patient::Model>
where
    C: ConnectionTrait,
{
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(Error::validation("account id cannot be empty"));
    }

    if let Some(existing) = find_by_account(db, account_id).await? {
        return Ok(existing);
    }

    let display_name = match display_name.trim() {
        "" => account_id,
        name => name,
    };

    let patient = patient::ActiveModel {
        account_id: Set(account_id.to_string()),
        display_name: Set(display_name.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    match patient.insert(db).await {
        Ok(model) => {
            info!(patient_id = model.id, "Patient onboarded");
            Ok(model)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_by_account(db, account_id)
                .await?
                .ok_or(Error::not_found("patient"))
        }
        Err(err) => Err(err.into()),
    }
}
