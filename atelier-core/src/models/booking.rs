use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A bookable treatment from the studio catalog. Read-only from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StudioService {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price_in_cents: i64,
    pub is_active: bool,
}

impl StudioService {
    pub fn new(name: impl Into<String>, duration_minutes: i32, price_in_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            duration_minutes,
            price_in_cents,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub status: BookingStatus,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_in_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// A pending booking awaiting staff confirmation. `starts_at` is a
    /// placeholder until staff pick the actual slot.
    pub fn pending(
        client_id: Uuid,
        service: &StudioService,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            service_id: service.id,
            status: BookingStatus::Pending,
            starts_at: now,
            duration_minutes: service.duration_minutes,
            total_in_cents: service.price_in_cents,
            notes,
            created_at: now,
        }
    }
}

/// What a client submits from the services page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: Uuid,
    pub message: String,
    pub preferred_dates: String,
}

impl BookingRequest {
    pub fn new(
        service_id: Uuid,
        message: impl Into<String>,
        preferred_dates: impl Into<String>,
    ) -> Self {
        Self {
            service_id,
            message: message.into(),
            preferred_dates: preferred_dates.into(),
        }
    }

    pub fn subject(&self, service: &StudioService) -> String {
        format!("Booking request: {}", service.name)
    }

    pub fn compose_body(&self, service: &StudioService) -> String {
        let mut body = format!("Booking request for {}", service.name);

        let dates = self.preferred_dates.trim();
        if !dates.is_empty() {
            body.push_str(&format!("\nPreferred dates: {}", dates));
        }

        let message = self.message.trim();
        if !message.is_empty() {
            body.push_str("\n\n");
            body.push_str(message);
        }

        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_booking_copies_service_terms() {
        let service = StudioService::new("Lash lift", 60, 6500);
        let client = Uuid::new_v4();
        let booking = Booking::pending(client, &service, None, Utc::now());

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.client_id, client);
        assert_eq!(booking.duration_minutes, 60);
        assert_eq!(booking.total_in_cents, 6500);
    }

    #[test]
    fn test_compose_body_embeds_service_and_dates() {
        let service = StudioService::new("Brow lamination", 45, 5000);
        let request = BookingRequest::new(service.id, "hello", "March 10");
        let body = request.compose_body(&service);

        assert!(body.contains("Brow lamination"));
        assert!(body.contains("March 10"));
        assert!(body.ends_with("hello"));
    }

    #[test]
    fn test_compose_body_without_message() {
        let service = StudioService::new("Facial", 30, 4000);
        let request = BookingRequest::new(service.id, "   ", "");
        assert_eq!(request.compose_body(&service), "Booking request for Facial");
    }
}
