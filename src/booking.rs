//! Booking Form
//!
//! Validates raw form input, posts it to the reservation service and keeps
//! a ticket for every successful submission in this session.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::client::{ApiError, ReservationApi};
use crate::model::{parse_fecha, NewReservation, Reservation};
use crate::notify::{Notification, Notifier};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+$";

/// Raw form input, as typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingFields {
    pub nombre: String,
    pub email: String,
    pub fecha: String,
    pub personas: String,
    pub mensaje: String,
}

impl Default for BookingFields {
    fn default() -> Self {
        Self {
            nombre: String::new(),
            email: String::new(),
            fecha: String::new(),
            personas: "1".to_string(),
            mensaje: String::new(),
        }
    }
}

impl BookingFields {
    /// Check the fields and build the request body
    pub fn validate(&self) -> Result<NewReservation, FieldError> {
        let nombre = required("nombre", &self.nombre)?;

        let email = required("email", &self.email)?;
        let re = Regex::new(EMAIL_PATTERN)
            .map_err(|_| FieldError::InvalidEmail(email.to_string()))?;
        if !re.is_match(email) {
            return Err(FieldError::InvalidEmail(email.to_string()));
        }

        let fecha_raw = required("fecha", &self.fecha)?;
        let fecha = parse_fecha(fecha_raw)
            .map_err(|_| FieldError::InvalidDate(fecha_raw.to_string()))?;

        let personas_raw = required("personas", &self.personas)?;
        let personas = match personas_raw.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => return Err(FieldError::InvalidPartySize(personas_raw.to_string())),
        };

        let mensaje = self.mensaje.trim();

        Ok(NewReservation {
            nombre: nombre.to_string(),
            email: email.to_string(),
            fecha,
            personas,
            mensaje: (!mensaje.is_empty()).then(|| mensaje.to_string()),
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        Err(FieldError::Required(field))
    } else {
        Ok(value)
    }
}

/// Confirmation of a stored booking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub code: Uuid,
    pub reservation: Reservation,
    pub issued_at: DateTime<Utc>,
}

impl Ticket {
    fn issue(reservation: Reservation) -> Self {
        Self {
            code: Uuid::new_v4(),
            reservation,
            issued_at: Utc::now(),
        }
    }

    /// Short code shown to the customer
    pub fn short_code(&self) -> String {
        self.code.simple().to_string()[..8].to_uppercase()
    }
}

/// Booking form bound to a reservation service
pub struct BookingForm {
    api: Arc<dyn ReservationApi>,
    notifier: Arc<dyn Notifier>,
    tickets: Vec<Ticket>,
}

impl BookingForm {
    pub fn new(api: Arc<dyn ReservationApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            tickets: Vec::new(),
        }
    }

    /// Tickets issued in this session, oldest first
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Validate and submit a booking
    ///
    /// The fields are only borrowed, so a failed submission leaves the
    /// caller's input as it was.
    pub async fn submit(&mut self, fields: &BookingFields) -> Result<&Ticket, BookingError> {
        let request = match fields.validate() {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "Booking rejected by validation");
                self.notifier.notify(Notification::error(e.to_string()));
                return Err(e.into());
            }
        };

        match self.api.create(&request).await {
            Ok(reservation) => {
                tracing::info!(
                    id = %reservation.id,
                    fecha = %reservation.fecha,
                    personas = reservation.personas,
                    "Reservation created"
                );
                self.notifier
                    .notify(Notification::success("Reserva enviada con éxito"));
                self.tickets.push(Ticket::issue(reservation));
                let idx = self.tickets.len() - 1;
                Ok(&self.tickets[idx])
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to submit reservation");
                self.notifier.notify(Notification::error(format!(
                    "Error al enviar reserva: {}",
                    e
                )));
                Err(e.into())
            }
        }
    }
}

/// Invalid form input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("El campo {0} es obligatorio")]
    Required(&'static str),

    #[error("Email no válido: {0}")]
    InvalidEmail(String),

    #[error("Fecha no válida: {0}")]
    InvalidDate(String),

    #[error("Número de personas no válido: {0}")]
    InvalidPartySize(String),
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error(transparent)]
    Invalid(#[from] FieldError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
