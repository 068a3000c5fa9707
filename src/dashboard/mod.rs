//! Admin Dashboard
//!
//! Passphrase-gated view over every reservation:
//!
//! - **session**: gate, session lifecycle, load/push/remove/export
//! - **runner**: single-task loop over view commands and push events
//! - **stats**: totals and the people-per-date chart
//!
//! The push subscription only exists inside an unlocked [`AdminSession`],
//! so locking out or dropping the dashboard always unsubscribes.

mod runner;
mod session;
pub mod stats;

pub use runner::{Command, RunExit};
pub use session::{prepend, remove_entry, AdminSession, Dashboard};
pub use stats::{ChartOrder, DashboardSummary, DateTotal};

use thiserror::Error;

use crate::client::ApiError;
use crate::export::ExportError;
use crate::gate::GateError;

/// Dashboard action errors
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Dashboard is locked")]
    Locked,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}
