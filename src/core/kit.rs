//! Kit checklist service - owner-side kit management.
//!
//! Every operation here is scoped to the owning patient; the token-addressed
//! public surface lives in [`crate::core::verification`].

use crate::{
    entities::{Kit, KitElement, Verification, kit, kit_element, verification},
    errors::{Error, Result},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Unit used for elements that do not name one.
pub const DEFAULT_ELEMENT_UNIT: &str = "u";

/// How many verification records the history endpoint returns.
pub const VERIFICATION_HISTORY_LIMIT: u64 = 100;

/// Input for creating a kit.
#[derive(Debug, Clone, Deserialize)]
pub struct NewKit {
    /// Display name
    pub name: String,
    /// Free text, may be empty
    #[serde(default)]
    pub description: String,
}

/// Editable kit attributes. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KitChanges {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// Deactivated kits disappear from the public surface
    pub active: Option<bool>,
}

/// One line of an element replacement request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInput {
    /// Item label, unique within the request
    pub label: String,
    /// Defaults to 1
    #[serde(default)]
    pub required_quantity: Option<i64>,
    /// Defaults to [`DEFAULT_ELEMENT_UNIT`]
    #[serde(default)]
    pub unit: Option<String>,
}

/// A kit together with its required elements.
#[derive(Debug, Clone, Serialize)]
pub struct KitDetail {
    /// Kit row
    #[serde(flatten)]
    pub kit: kit::Model,
    /// Elements ordered by insertion
    pub elements: Vec<kit_element::Model>,
}

/// Fresh public token: 32 random bytes, URL-safe base64 without padding.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("kit name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Creates an active kit with a fresh token and no elements.
pub async fn create_kit(db: &DatabaseConnection, patient_id: i64, new: NewKit) -> Result<kit::Model> {
    let name = validate_name(&new.name)?;

    let created = kit::ActiveModel {
        patient_id: Set(patient_id),
        name: Set(name),
        description: Set(new.description.trim().to_string()),
        public_token: Set(generate_token()),
        active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(kit_id = created.id, patient_id, "Kit created");
    Ok(created)
}

/// Lists a patient's kits, newest first.
pub async fn list_kits(db: &DatabaseConnection, patient_id: i64) -> Result<Vec<kit::Model>> {
    Kit::find()
        .filter(kit::Column::PatientId.eq(patient_id))
        .order_by_desc(kit::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a kit owned by the patient; anything else is `NotFound`.
pub async fn get_owned<C>(db: &C, patient_id: i64, kit_id: i64) -> Result<kit::Model>
where
    C: ConnectionTrait,
{
    Kit::find_by_id(kit_id)
        .filter(kit::Column::PatientId.eq(patient_id))
        .one(db)
        .await?
        .ok_or(Error::not_found("kit"))
}

/// Elements of a kit in insertion order.
pub async fn list_elements<C>(db: &C, kit_id: i64) -> Result<Vec<kit_element::Model>>
where
    C: ConnectionTrait,
{
    KitElement::find()
        .filter(kit_element::Column::KitId.eq(kit_id))
        .order_by_asc(kit_element::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// An owned kit with its elements.
pub async fn get_detail(db: &DatabaseConnection, patient_id: i64, kit_id: i64) -> Result<KitDetail> {
    let kit = get_owned(db, patient_id, kit_id).await?;
    let elements = list_elements(db, kit.id).await?;
    Ok(KitDetail { kit, elements })
}

/// Edits name, description or the active flag.
pub async fn update_kit(
    db: &DatabaseConnection,
    patient_id: i64,
    kit_id: i64,
    changes: KitChanges,
) -> Result<kit::Model> {
    let existing = get_owned(db, patient_id, kit_id).await?;

    let mut model: kit::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        model.name = Set(validate_name(&name)?);
    }
    if let Some(description) = changes.description {
        model.description = Set(description.trim().to_string());
    }
    if let Some(active) = changes.active {
        model.active = Set(active);
    }

    let updated = model.update(db).await?;
    info!(kit_id, active = updated.active, "Kit updated");
    Ok(updated)
}

/// Deletes a kit with its elements and verification history.
pub async fn delete_kit(db: &DatabaseConnection, patient_id: i64, kit_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let existing = get_owned(&txn, patient_id, kit_id).await?;

    Verification::delete_many()
        .filter(verification::Column::KitId.eq(existing.id))
        .exec(&txn)
        .await?;
    KitElement::delete_many()
        .filter(kit_element::Column::KitId.eq(existing.id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    info!(kit_id, patient_id, "Kit deleted");
    Ok(())
}

struct ValidElement {
    label: String,
    required_quantity: i64,
    unit: String,
}

fn validate_elements(items: Vec<ElementInput>) -> Result<Vec<ValidElement>> {
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(items.len());

    for item in items {
        let label = item.label.trim().to_string();
        if label.is_empty() {
            return Err(Error::validation("element label cannot be empty"));
        }
        let required_quantity = item.required_quantity.unwrap_or(1);
        if required_quantity < 0 {
            return Err(Error::validation(format!(
                "required quantity for {label:?} must be >= 0"
            )));
        }
        if !seen.insert(label.clone()) {
            return Err(Error::validation(format!("duplicate element label {label:?}")));
        }
        let unit = item
            .unit
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_ELEMENT_UNIT.to_string());

        valid.push(ValidElement {
            label,
            required_quantity,
            unit,
        });
    }

    Ok(valid)
}

/// Replaces the whole element set of a kit.
///
/// The request is validated before anything is touched. The delete and the
/// insert share one transaction, so readers see either the old set or the new
/// one, never an empty kit in between.
pub async fn replace_elements(
    db: &DatabaseConnection,
    patient_id: i64,
    kit_id: i64,
    items: Vec<ElementInput>,
) -> Result<Vec<kit_element::Model>> {
    let valid = validate_elements(items)?;

    let txn = db.begin().await?;
    let kit = get_owned(&txn, patient_id, kit_id).await?;

    KitElement::delete_many()
        .filter(kit_element::Column::KitId.eq(kit.id))
        .exec(&txn)
        .await?;

    let count = valid.len();
    if !valid.is_empty() {
        let rows = valid.into_iter().map(|e| kit_element::ActiveModel {
            kit_id: Set(kit.id),
            label: Set(e.label),
            required_quantity: Set(e.required_quantity),
            unit: Set(e.unit),
            ..Default::default()
        });
        KitElement::insert_many(rows).exec(&txn).await?;
    }

    let elements = list_elements(&txn, kit.id).await?;
    txn.commit().await?;

    info!(kit_id, elements = count, "Kit elements replaced");
    Ok(elements)
}

/// Issues a new public token. The previous token stops resolving at commit.
pub async fn rotate_token(db: &DatabaseConnection, patient_id: i64, kit_id: i64) -> Result<String> {
    let existing = get_owned(db, patient_id, kit_id).await?;

    let mut model: kit::ActiveModel = existing.into();
    model.public_token = Set(generate_token());
    let updated = model.update(db).await?;

    info!(kit_id, "Kit token rotated");
    Ok(updated.public_token)
}

/// Verification history of an owned kit, most recent first, bounded.
pub async fn list_verifications(
    db: &DatabaseConnection,
    patient_id: i64,
    kit_id: i64,
) -> Result<Vec<verification::Model>> {
    let kit = get_owned(db, patient_id, kit_id).await?;
    Verification::find()
        .filter(verification::Column::KitId.eq(kit.id))
        .order_by_desc(verification::Column::Id)
        .limit(VERIFICATION_HISTORY_LIMIT)
        .all(db)
        .await
        .map_err(Into::into)
}
