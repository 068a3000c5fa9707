//! Reservation data model
//!
//! The single entity handled by the client, plus the validation boundary
//! used for every record received from the external service.

mod error;
mod reservation;

pub use error::RecordError;
pub use reservation::{parse_fecha, NewReservation, Reservation, ReservationId, WireReservation};
