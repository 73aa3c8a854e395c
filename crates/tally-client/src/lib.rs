pub mod blob;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod diagnostics;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod notification;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod setup;
pub mod statement;

pub use contracts::envelope::{FailureEnvelope, SuccessEnvelope};
pub use error::{ClientError, ClientResult};
pub use pipeline::{Pipeline, ProcessOutcome, ReconciliationRun};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
