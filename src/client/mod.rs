//! Reservation Service Client
//!
//! The external service owns persistence. This module talks to it:
//!
//! - **ReservationApi**: the seam used by the dashboard and the booking form
//! - **HttpReservationApi**: REST implementation over reqwest
//!
//! Every record in a response is validated into a
//! [`Reservation`](crate::model::Reservation) before it is returned.

mod error;
mod http;

pub use error::ApiError;
pub use http::{ApiClientConfig, HttpReservationApi, RESERVATIONS_PATH};

use async_trait::async_trait;

use crate::model::{NewReservation, Reservation, ReservationId};

/// Operations the client needs from the reservation service
#[async_trait]
pub trait ReservationApi: Send + Sync {
    /// Fetch every reservation, in the order the service returns them
    async fn list(&self) -> Result<Vec<Reservation>, ApiError>;

    /// Create a reservation and return the stored record
    async fn create(&self, reservation: &NewReservation) -> Result<Reservation, ApiError>;

    /// Delete a reservation by identifier
    async fn delete(&self, id: &ReservationId) -> Result<(), ApiError>;
}
