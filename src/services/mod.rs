//! Application services
//!
//! The workflows built on top of the repository layer: dataset
//! export/import, the feature-flagged demo reset, and identity provider
//! provisioning.

pub mod export;
pub mod keycloak;
pub mod reset;

pub use export::{DatabaseExport, ExportError, ExportRange, ExportService};
pub use keycloak::{IdentityApi, KeycloakClient, ProvisioningError, ProvisioningService};
pub use reset::{ResetError, ResetService};
