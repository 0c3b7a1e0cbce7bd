//! `shipaudit-audit`: courier invoice audit engine.
//!
//! Pure pipeline crate: takes an already-read grid or keyed rows plus a
//! rate card, returns flagged discrepancies. History and weight trends
//! persist through an injected [`Storage`]. No file IO.

pub mod contract;
pub mod engine;
pub mod error;
pub mod header;
pub mod history;
pub mod mapping;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod regression;
pub mod storage;

pub use contract::ContractRules;
pub use engine::{analyze, prepare_grid, prepare_rows, AuditRun, MappingSource, PreparedInvoice};
pub use error::AuditError;
pub use history::{AuditHistory, AuditRecord, OverchargeByType};
pub use model::{AnalysisResult, CanonicalField, ColumnMapping, Discrepancy, RawRow, RawValue, Shipment};
pub use regression::{RegressionResult, WeightDataPoint, WeightTracker};
pub use storage::{MemoryStorage, Storage, StorageError};
