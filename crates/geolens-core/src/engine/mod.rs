pub mod runner;

pub use runner::{AuditFailure, AuditRunner, AuditSummary};
