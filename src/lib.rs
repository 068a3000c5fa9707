//! # Reservas
//!
//! Client for a reservation service: a public booking form and a
//! passphrase-gated admin dashboard that stays in sync with the service.
//!
//! ## Features
//!
//! - **Booking**: validated submissions with a confirmation ticket
//! - **Live dashboard**: full reload plus Socket.IO push of new bookings
//! - **Aggregates**: totals, most recent booking, people per date
//! - **Export**: the cached list as `reservas.xlsx` (or CSV)
//! - **Calendar**: Monday-first month grid of bookings
//!
//! ## Modules
//!
//! - [`model`]: validated reservation records
//! - [`client`]: REST client for the reservation service
//! - [`push`]: Socket.IO push channel
//! - [`gate`]: persisted admin access flag
//! - [`dashboard`]: admin session, sync and aggregation
//! - [`export`]: spreadsheet export
//! - [`booking`]: booking form
//! - [`calendar`]: calendar events and month layout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reservas::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = Arc::new(HttpReservationApi::new(ApiClientConfig::default())?);
//!     let gate = AccessGate::with_default_passphrase(Arc::new(MemoryGateStore::new()));
//!
//!     let mut dashboard = Dashboard::new(gate, api, Arc::new(TracingNotifier))
//!         .with_push(Arc::new(SocketIoPush::new(PushConfig::default())));
//!
//!     dashboard.unlock("1234admin").await?;
//!
//!     let summary = dashboard.summary();
//!     println!("{} reservas, {} personas", summary.total_reservations, summary.total_people);
//!
//!     Ok(())
//! }
//! ```

pub mod booking;
pub mod calendar;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod gate;
pub mod model;
pub mod notify;
pub mod push;
pub mod render;

// Re-export top-level types for convenience
pub use model::{NewReservation, RecordError, Reservation, ReservationId};

pub use client::{ApiClientConfig, ApiError, HttpReservationApi, ReservationApi};

pub use push::{PushConfig, PushError, PushEvent, PushSource, SocketIoPush, Subscription};

pub use gate::{AccessGate, FileGateStore, GateError, GateStore, MemoryGateStore};

pub use dashboard::{
    AdminSession, ChartOrder, Command, Dashboard, DashboardError, DashboardSummary, DateTotal,
    RunExit,
};

pub use export::{export_spreadsheet, ExportError, ExportFormat, ExportOptions};

pub use booking::{BookingError, BookingFields, BookingForm, FieldError, Ticket};

pub use calendar::{CalendarEvent, MonthView};

pub use notify::{ChannelNotifier, Level, Notification, Notifier, TracingNotifier};

pub use config::{Config, ConfigError, LoggingConfig};
