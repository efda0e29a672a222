//! # API Shared
//!
//! Request/response types and utilities shared by the NeuroCast API
//! surfaces. Transport-level concerns only: payloads that mirror core types
//! are carried as JSON values and converted at the handler edge, so this
//! crate stays free of core business logic.

pub mod dto;
pub mod health;

pub use dto::{
    ErrorRes, LedgerEntryRes, RunCaseReq, RunCaseRes, VerifyVtpReq, VerifyVtpRes,
};
pub use health::{HealthRes, HealthService};
