//! Kit verification - diffing a claimed manifest against a kit's elements.
//!
//! The public pair ([`public_fetch`], [`public_verify`]) resolves kits by token
//! alone and only ever sees active kits. Unknown, rotated and inactive tokens
//! all come back as the same `NotFound`.
//!
//! Claimed manifests come from untrusted clients and are parsed leniently:
//! entries without a label are skipped, and quantities that are missing,
//! non-numeric or negative count as zero.

use crate::{
    core::kit,
    entities::{Kit, VerificationOrigin, kit as kit_entity, kit_element, verification},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Result of a verification, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    /// True when nothing is missing
    pub ok: bool,
    /// Label to missing quantity; labels with nothing missing are omitted
    pub shortfalls: BTreeMap<String, i64>,
}

/// What an anonymous token holder may see of a kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKit {
    /// Kit name
    pub name: String,
    /// Kit description
    pub description: String,
    /// Required elements
    pub elements: Vec<PublicElement>,
}

/// One required element on the public checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicElement {
    /// Item label
    pub label: String,
    /// Quantity that must be present
    pub required_quantity: i64,
    /// Unit label
    pub unit: String,
}

impl From<kit_element::Model> for PublicElement {
    fn from(element: kit_element::Model) -> Self {
        Self {
            label: element.label,
            required_quantity: element.required_quantity,
            unit: element.unit,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn lenient_quantity(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            // Saturating cast; NaN becomes 0
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    parsed.max(0)
}

/// Sums claimed quantities per label from a raw `items` value.
///
/// Duplicate labels add up. A non-array value is an empty manifest.
#[must_use]
pub fn sum_claims(items: &Value) -> HashMap<String, i64> {
    let mut claimed: HashMap<String, i64> = HashMap::new();
    let Some(entries) = items.as_array() else {
        return claimed;
    };

    for entry in entries {
        let Some(label) = entry.get("label").and_then(Value::as_str) else {
            continue;
        };
        if label.is_empty() {
            continue;
        }
        let quantity = lenient_quantity(entry.get("quantity"));
        let total = claimed.entry(label.to_string()).or_insert(0);
        *total = total.saturating_add(quantity);
    }

    claimed
}

/// Shortfall per required element: `max(0, required - claimed)`, zeros omitted.
#[must_use]
pub fn compute_shortfalls(
    elements: &[kit_element::Model],
    claimed: &HashMap<String, i64>,
) -> BTreeMap<String, i64> {
    elements
        .iter()
        .filter_map(|element| {
            let got = claimed.get(&element.label).copied().unwrap_or(0);
            let missing = element.required_quantity.saturating_sub(got).max(0);
            (missing > 0).then(|| (element.label.clone(), missing))
        })
        .collect()
}

/// Diffs a raw manifest against a kit's elements.
#[must_use]
pub fn diff(elements: &[kit_element::Model], items: &Value) -> VerificationOutcome {
    let shortfalls = compute_shortfalls(elements, &sum_claims(items));
    VerificationOutcome {
        ok: shortfalls.is_empty(),
        shortfalls,
    }
}

/// Resolves an active kit by its public token.
pub async fn find_active_by_token<C>(db: &C, token: &str) -> Result<kit_entity::Model>
where
    C: ConnectionTrait,
{
    Kit::find()
        .filter(kit_entity::Column::PublicToken.eq(token))
        .filter(kit_entity::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or(Error::not_found("kit"))
}

/// Public checklist for a token: name, description and elements only.
pub async fn public_fetch(db: &DatabaseConnection, token: &str) -> Result<PublicKit> {
    let kit = find_active_by_token(db, token).await?;
    let elements = kit::list_elements(db, kit.id).await?;
    Ok(PublicKit {
        name: kit.name,
        description: kit.description,
        elements: elements.into_iter().map(PublicElement::from).collect(),
    })
}

async fn record(
    db: &DatabaseConnection,
    kit: &kit_entity::Model,
    items: &Value,
    origin: VerificationOrigin,
    verified_by: Option<String>,
) -> Result<VerificationOutcome> {
    let elements = kit::list_elements(db, kit.id).await?;
    let outcome = diff(&elements, items);

    let shortfalls = Value::Object(
        outcome
            .shortfalls
            .iter()
            .map(|(label, missing)| (label.clone(), Value::from(*missing)))
            .collect(),
    );

    let stored = verification::ActiveModel {
        kit_id: Set(kit.id),
        origin: Set(origin),
        ok: Set(outcome.ok),
        shortfalls: Set(shortfalls),
        verified_by: Set(verified_by),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        kit_id = kit.id,
        verification_id = stored.id,
        ?origin,
        ok = outcome.ok,
        missing = outcome.shortfalls.len(),
        "Kit verified"
    );
    Ok(outcome)
}

/// Anonymous verification through the public token.
pub async fn public_verify(db: &DatabaseConnection, token: &str, items: &Value) -> Result<VerificationOutcome> {
    let kit = find_active_by_token(db, token).await?;
    record(db, &kit, items, VerificationOrigin::PublicQr, None).await
}

/// Owner verification; records the verifying account.
pub async fn private_verify(
    db: &DatabaseConnection,
    patient_id: i64,
    kit_id: i64,
    account_id: &str,
    items: &Value,
) -> Result<VerificationOutcome> {
    let kit = kit::get_owned(db, patient_id, kit_id).await?;
    record(
        db,
        &kit,
        items,
        VerificationOrigin::Private,
        Some(account_id.to_string()),
    )
    .await
}
