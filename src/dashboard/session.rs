//! Admin session and dashboard state
//!
//! The [`Dashboard`] owns the access gate and, while unlocked, one
//! [`AdminSession`]. The session holds the cached list and the push
//! subscription; ending the session drops both, which unsubscribes.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::stats::{ChartOrder, DashboardSummary};
use super::DashboardError;
use crate::client::{ApiError, ReservationApi};
use crate::export::{self, ExportFormat, ExportOptions};
use crate::gate::{AccessGate, GateError};
use crate::model::{Reservation, ReservationId};
use crate::notify::{Notification, Notifier};
use crate::push::{PushEvent, PushSource, Subscription};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// State that only exists while the dashboard is unlocked
pub struct AdminSession {
    reservations: Vec<Reservation>,
    pub(super) subscription: Option<Subscription>,
    opened_at: DateTime<Utc>,
}

impl AdminSession {
    fn new(subscription: Option<Subscription>) -> Self {
        Self {
            reservations: Vec::new(),
            subscription,
            opened_at: Utc::now(),
        }
    }

    /// Cached reservations, newest first
    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Whether push updates are being received
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }
}

impl Drop for AdminSession {
    fn drop(&mut self) {
        tracing::debug!(
            live = self.subscription.is_some(),
            cached = self.reservations.len(),
            "Admin session ended"
        );
    }
}

/// Put `reservation` at the head of the list
///
/// An entry with the same id is removed first, so ids stay unique.
pub fn prepend(list: &mut Vec<Reservation>, reservation: Reservation) {
    list.retain(|r| r.id != reservation.id);
    list.insert(0, reservation);
}

/// Remove the entry with `id`; returns whether one was removed
pub fn remove_entry(list: &mut Vec<Reservation>, id: &ReservationId) -> bool {
    let before = list.len();
    list.retain(|r| &r.id != id);
    list.len() != before
}

/// Admin dashboard: gate, synchronized list and aggregates
pub struct Dashboard {
    gate: AccessGate,
    pub(super) api: Arc<dyn ReservationApi>,
    push: Option<Arc<dyn PushSource>>,
    notifier: Arc<dyn Notifier>,
    chart_order: ChartOrder,
    export_options: ExportOptions,
    pub(super) session: Option<AdminSession>,
    view: watch::Sender<DashboardSummary>,
}

impl Dashboard {
    /// Create a snapshot-only dashboard; see [`Dashboard::with_push`]
    pub fn new(
        gate: AccessGate,
        api: Arc<dyn ReservationApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (view, _) = watch::channel(DashboardSummary::default());
        Self {
            gate,
            api,
            push: None,
            notifier,
            chart_order: ChartOrder::default(),
            export_options: ExportOptions::default(),
            session: None,
            view,
        }
    }

    /// Subscribe to push updates in every session
    pub fn with_push(mut self, push: Arc<dyn PushSource>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn with_chart_order(mut self, order: ChartOrder) -> Self {
        self.chart_order = order;
        self
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export_options = options;
        self
    }

    pub fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub fn session(&self) -> Option<&AdminSession> {
        self.session.as_ref()
    }

    /// Cached reservations; empty while locked
    pub fn reservations(&self) -> &[Reservation] {
        self.session
            .as_ref()
            .map(AdminSession::reservations)
            .unwrap_or(&[])
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::from_list(self.reservations(), self.chart_order)
    }

    /// Receive a fresh summary whenever the list changes
    pub fn watch_summary(&self) -> watch::Receiver<DashboardSummary> {
        self.view.subscribe()
    }

    /// Open a session if the persisted gate flag is already set
    ///
    /// Returns whether the dashboard is unlocked.
    pub async fn resume(&mut self) -> bool {
        if !self.gate.is_unlocked() {
            return false;
        }
        self.open_session().await;
        true
    }

    /// Try a passphrase; on success open the session and load the list
    pub async fn unlock(&mut self, candidate: &str) -> Result<(), GateError> {
        if let Err(e) = self.gate.submit_passphrase(candidate) {
            self.notifier.notify(Notification::error(e.to_string()));
            return Err(e);
        }
        self.open_session().await;
        Ok(())
    }

    /// End the session and clear the gate
    pub fn lock_out(&mut self) -> Result<(), GateError> {
        self.end_session();
        self.gate.lock_out()
    }

    /// Drop the session without touching the gate
    pub(super) fn end_session(&mut self) {
        if self.session.take().is_some() {
            self.publish();
        }
    }

    /// End the session, waiting for the push transport to unsubscribe
    pub async fn close_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(subscription) = session.subscription.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, subscription.close())
                .await
                .is_err()
            {
                tracing::warn!("Push channel did not close in time");
            }
        }
        drop(session);
        self.publish();
    }

    async fn open_session(&mut self) {
        if self.session.is_some() {
            return;
        }

        let subscription = match &self.push {
            Some(push) => match push.subscribe().await {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    tracing::warn!(error = %e, "Push channel unavailable, continuing without live updates");
                    self.notifier.notify(Notification::error(format!(
                        "Sin actualizaciones en vivo: {}",
                        e
                    )));
                    None
                }
            },
            None => None,
        };

        tracing::info!(live = subscription.is_some(), "Admin session opened");
        self.session = Some(AdminSession::new(subscription));
        self.load_all().await;
    }

    /// Replace the cached list with the service's
    ///
    /// No-op while locked. Returns whether the list was replaced.
    pub async fn load_all(&mut self) -> bool {
        if self.session.is_none() {
            tracing::debug!("Dashboard locked, skipping load");
            return false;
        }
        let api = Arc::clone(&self.api);
        let result = api.list().await;
        self.apply_load(result)
    }

    pub(super) fn apply_load(&mut self, result: Result<Vec<Reservation>, ApiError>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        match result {
            Ok(list) => {
                tracing::info!(count = list.len(), "Loaded reservations");
                session.reservations = list;
                self.publish();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load reservations");
                self.notifier.notify(Notification::error(format!(
                    "No se pudieron cargar las reservas: {}",
                    e
                )));
                false
            }
        }
    }

    /// Apply a pushed creation; ignored while locked
    pub fn on_push_create(&mut self, reservation: Reservation) -> bool {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!(id = %reservation.id, "Dropping push event, dashboard locked");
            return false;
        };

        let message = format!("Nueva reserva de {}", reservation.nombre);
        let detail = format!(
            "{} reservó para {} persona(s)",
            reservation.nombre, reservation.personas
        );
        tracing::info!(id = %reservation.id, "New reservation pushed");
        prepend(&mut session.reservations, reservation);
        self.publish();
        self.notifier.notify(Notification::info(message));
        self.notifier.notify(Notification::info(detail).with_chime());
        true
    }

    pub(super) fn on_push_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::NewReservation(reservation) => {
                self.on_push_create(reservation);
            }
            PushEvent::Disconnected { reason } => {
                tracing::warn!(reason = %reason, "Live updates stopped");
                self.drop_subscription();
                self.notifier.notify(Notification::error(format!(
                    "Conexión en vivo perdida: {}",
                    reason
                )));
            }
        }
    }

    pub(super) fn drop_subscription(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.subscription = None;
        }
    }

    /// Delete a reservation on the service, then locally
    pub async fn remove(&mut self, id: &ReservationId) -> Result<(), DashboardError> {
        if self.session.is_none() {
            return Err(DashboardError::Locked);
        }

        let api = Arc::clone(&self.api);
        match api.delete(id).await {
            Ok(()) => {
                if let Some(session) = self.session.as_mut() {
                    remove_entry(&mut session.reservations, id);
                }
                tracing::info!(id = %id, "Reservation deleted");
                self.publish();
                self.notifier
                    .notify(Notification::success("Reserva eliminada"));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Failed to delete reservation");
                self.notifier.notify(Notification::error(format!(
                    "No se pudo eliminar la reserva: {}",
                    e
                )));
                Err(e.into())
            }
        }
    }

    /// Write the cached list to a spreadsheet and return its path
    pub fn export(
        &self,
        target: Option<&Path>,
        format: ExportFormat,
    ) -> Result<PathBuf, DashboardError> {
        if self.session.is_none() {
            return Err(DashboardError::Locked);
        }

        let path = self.export_options.resolve(target, format);
        match export::export_to(
            self.reservations(),
            &path,
            format,
            &self.export_options.sheet_name,
        ) {
            Ok(()) => {
                self.notifier.notify(Notification::success(format!(
                    "Exportado a {}",
                    path.display()
                )));
                Ok(path)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Export failed");
                self.notifier
                    .notify(Notification::error(format!("Error al exportar: {}", e)));
                Err(e.into())
            }
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.summary());
    }
}
