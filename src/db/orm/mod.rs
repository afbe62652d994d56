//! Database ORM layer
//!
//! Traits and building blocks the entity layer is written against:
//! - entity metadata and schema generation ([DatabaseEntity],
//!   [DatabaseSchema])
//! - composed, parameterized queries ([EntityQuery])
//! - field filters ([StringFilter], [DateFilter], [IdFilter],
//!   [BoolFilter])
//! - row decoding ([FromSqlRow]) and audit stamping ([TrackedEntity])
//! - the staged unit-of-work ([ChangeTracker]) and the typed facade
//!   ([DbRepository]) with transaction scopes ([TransactionScope])
//!
//! # Repository Pattern
//!
//! ```rust,ignore
//! let sheets = db.time_sheets();
//! let rows = sheets
//!     .get(
//!         EntityQuery::new()
//!             .filter(&TimeSheetFilter {
//!                 customer_id: Some(IdFilter::eq(customer_id)),
//!                 ..Default::default()
//!             })
//!             .include("Activity")
//!             .order_by(&OrderBy::date_asc("start_date")),
//!     )
//!     .await?;
//! ```

mod builder;
mod filters;
mod repository;
mod tracker;
mod traits;

pub use builder::*;
pub use filters::*;
pub use repository::*;
pub use tracker::{ChangeAction, ChangeTracker};
pub use traits::*;
