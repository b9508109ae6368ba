//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod alert;
pub mod kit;
pub mod kit_element;
pub mod movement;
pub mod patient;
pub mod supply;
pub mod verification;

// Re-export specific types to avoid conflicts
pub use alert::{AlertKind, Column as AlertColumn, Entity as Alert, Model as AlertModel};
pub use kit::{Column as KitColumn, Entity as Kit, Model as KitModel};
pub use kit_element::{
    Column as KitElementColumn, Entity as KitElement, Model as KitElementModel,
};
pub use movement::{
    Column as MovementColumn, Entity as Movement, Model as MovementModel, MovementReason,
};
pub use patient::{Column as PatientColumn, Entity as Patient, Model as PatientModel};
pub use supply::{Column as SupplyColumn, Entity as Supply, Model as SupplyModel, SupplyCategory};
pub use verification::{
    Column as VerificationColumn, Entity as Verification, Model as VerificationModel,
    VerificationOrigin,
};
