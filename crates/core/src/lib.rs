//! # COA Core
//!
//! Core business logic for the certificate-of-analysis registry:
//! - Certificate record model and the fixed sheet column order
//! - Record store (JSON-file backed) with sequential code assignment
//! - User directory with the unique-username invariant
//! - Best-effort activity log
//!
//! **No API concerns**: HTTP routing, role-header extraction, and response
//! shaping belong to the server binary; PDF composition belongs to
//! `coa-render`.

pub mod audit;
pub mod config;
pub mod error;
pub mod record;
pub mod service;
pub mod store;
pub mod users;

pub use audit::{ActivityEntry, ActivityLog, MemoryLog, TracingLog};
pub use config::CoreConfig;
pub use error::{CoaError, CoaResult};
pub use record::{column_order, CertificateRecord, TestRow, DEFAULT_CONCLUSION, HIDDEN_PREFIX};
pub use service::CertificateService;
pub use store::{next_code_after, JsonFileStore, MemoryStore, RecordStore};
pub use users::{JsonFileDirectory, MemoryDirectory, UserAccount, UserDirectory, UserUpdate};
