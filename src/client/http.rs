//! Reservation REST API Client
//!
//! HTTP client for the external reservation service:
//!
//! - `GET    /api/reservas`      - list every reservation
//! - `POST   /api/reservas`      - create a reservation
//! - `DELETE /api/reservas/{id}` - delete a reservation

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use super::error::ApiError;
use super::ReservationApi;
use crate::model::{NewReservation, Reservation, ReservationId};

/// Path of the reservation collection, relative to the base URL
pub const RESERVATIONS_PATH: &str = "/api/reservas";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the service (e.g., "http://localhost:3001")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// reqwest-backed implementation of [`ReservationApi`]
pub struct HttpReservationApi {
    client: Client,
    config: ApiClientConfig,
}

impl HttpReservationApi {
    /// Create a new client with the given configuration
    pub fn new(mut config: ApiClientConfig) -> Result<Self, ApiError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.config.base_url, RESERVATIONS_PATH)
    }

    fn item_url(&self, id: &ReservationId) -> String {
        format!(
            "{}/{}",
            self.collection_url(),
            urlencoding::encode(id.as_str())
        )
    }
}

#[async_trait]
impl ReservationApi for HttpReservationApi {
    async fn list(&self) -> Result<Vec<Reservation>, ApiError> {
        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let body = success_json(response).await?;
        let reservations = decode_list(body)?;

        tracing::debug!(count = reservations.len(), "Fetched reservations");
        Ok(reservations)
    }

    async fn create(&self, reservation: &NewReservation) -> Result<Reservation, ApiError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(reservation)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let body = success_json(response).await?;
        let created = decode_created(body)?;

        tracing::info!(id = %created.id, fecha = %created.fecha, "Reservation created");
        Ok(created)
    }

    async fn delete(&self, id: &ReservationId) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.item_url(id))
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        if response.status().is_success() {
            tracing::info!(id = %id, "Reservation deleted");
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }
}

/// Read the JSON body of a 2xx response, or turn the response into an error
async fn success_json(response: Response) -> Result<Value, ApiError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

async fn status_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    ApiError::Status {
        status,
        message: error_message(&text),
    }
}

/// Pull a human-readable message out of an error body
fn error_message(text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        for key in ["error", "mensaje", "message"] {
            if let Some(Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    text.trim().to_string()
}

/// Validate every element of a list response
pub(crate) fn decode_list(body: Value) -> Result<Vec<Reservation>, ApiError> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            return Err(ApiError::Decode(format!(
                "expected a JSON array of reservations, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            Reservation::from_json(item).map_err(|source| ApiError::InvalidRecord { index, source })
        })
        .collect()
}

/// The created record, either bare or wrapped as `{"reserva": {...}}`
pub(crate) fn decode_created(body: Value) -> Result<Reservation, ApiError> {
    let record = match body {
        Value::Object(mut map) if map.get("reserva").map_or(false, Value::is_object) => {
            map.remove("reserva").unwrap_or(Value::Null)
        }
        other => other,
    };

    Reservation::from_json(record).map_err(|source| ApiError::InvalidRecord { index: 0, source })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{delete, get},
        Json, Router,
    };
    use serde_json::json;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> HttpReservationApi {
        HttpReservationApi::new(ApiClientConfig {
            base_url,
            request_timeout_ms: 2_000,
        })
        .unwrap()
    }

    fn sample_list() -> Value {
        json!([
            {"_id": 1, "nombre": "Ana", "email": "ana@example.com", "fecha": "2024-06-01", "personas": 2, "mensaje": ""},
            {"_id": 2, "nombre": "Luis", "email": "luis@example.com", "fecha": "2024-06-02", "personas": 3}
        ])
    }

    #[test]
    fn test_default_config() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3001");
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_urls_trim_trailing_slash_and_encode_id() {
        let client = client_for("http://localhost:3001/".to_string());
        assert_eq!(client.collection_url(), "http://localhost:3001/api/reservas");
        assert_eq!(
            client.item_url(&ReservationId::from("a b/c")),
            "http://localhost:3001/api/reservas/a%20b%2Fc"
        );
    }

    #[test]
    fn test_decode_list_reports_index() {
        let body = json!([
            {"_id": "a", "nombre": "Ana", "email": "a@x.io", "fecha": "2024-06-01", "personas": 2},
            {"_id": "b", "nombre": "Luis", "email": "l@x.io", "fecha": "2024-06-01"}
        ]);
        let err = decode_list(body).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn test_decode_list_rejects_object() {
        let err = decode_list(json!({"reservas": []})).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_decode_created_unwraps_envelope() {
        let created = decode_created(json!({
            "mensaje": "ok",
            "reserva": {"_id": "z", "nombre": "Eva", "email": "e@x.io", "fecha": "2024-07-01", "personas": 1}
        }))
        .unwrap();
        assert_eq!(created.id.as_str(), "z");
    }

    #[test]
    fn test_error_message_prefers_json_field() {
        assert_eq!(error_message(r#"{"error": "Fecha ocupada"}"#), "Fecha ocupada");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_list_reservations() {
        let router = Router::new().route(
            RESERVATIONS_PATH,
            get(|| async { Json(sample_list()) }),
        );
        let client = client_for(spawn_server(router).await);

        let list = client.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id.as_str(), "1");
        assert_eq!(list[1].personas, 3);
    }

    #[tokio::test]
    async fn test_create_reservation() {
        let router = Router::new().route(
            RESERVATIONS_PATH,
            axum::routing::post(|Json(mut body): Json<Value>| async move {
                body["_id"] = json!("new-id");
                (StatusCode::CREATED, Json(body))
            }),
        );
        let client = client_for(spawn_server(router).await);

        let new = NewReservation {
            nombre: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            fecha: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            personas: 2,
            mensaje: Some("Cumpleaños".to_string()),
        };
        let created = client.create(&new).await.unwrap();

        assert_eq!(created.id.as_str(), "new-id");
        assert_eq!(created.nombre, "Ana");
        assert_eq!(created.mensaje.as_deref(), Some("Cumpleaños"));
    }

    #[tokio::test]
    async fn test_create_non_2xx_is_failure() {
        let router = Router::new().route(
            RESERVATIONS_PATH,
            axum::routing::post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Datos incompletos"})),
                )
            }),
        );
        let client = client_for(spawn_server(router).await);

        let new = NewReservation {
            nombre: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            fecha: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            personas: 2,
            mensaje: None,
        };
        match client.create(&new).await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Datos incompletos");
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_reservation() {
        let router = Router::new().route(
            "/api/reservas/:id",
            delete(|Path(id): Path<String>| async move {
                if id == "a b" {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::NOT_FOUND
                }
            }),
        );
        let client = client_for(spawn_server(router).await);

        client.delete(&ReservationId::from("a b")).await.unwrap();

        let err = client.delete(&ReservationId::from("missing")).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}", addr));
        let err = client.list().await.unwrap_err();
        assert!(err.is_transport());
    }
}
