//! Partner desk: charter airline registry, charter bookings and the Cuba
//! Transtur car-rental desk. State lives in memory for the process lifetime.

use crate::errors::AdminError;
use crate::models::{lenient_f64, present, require};
use crate::settings;
use crate::signing::random_id;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharterAirline {
    pub id: String,
    pub name: String,
    pub url: String,
    pub markup: f64,
    pub active: bool,
    pub routes: Vec<String>,
    pub check_frequency: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharterAirlineInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub markup: Option<f64>,
    /// `"active"` or anything else
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    /// Comma separated string or array
    #[serde(default)]
    pub routes: Option<Value>,
    #[serde(default)]
    pub check_frequency: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharterBooking {
    pub id: String,
    pub passenger_name: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub airline: Option<String>,
    pub status: String,
    pub total_price: f64,
    pub created_at: String,
    pub can_modify: bool,
    pub can_cancel: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharterBookingInput {
    #[serde(default)]
    pub passenger_name: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub departure_date: Option<String>,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransturBooking {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub pickup_date: String,
    pub return_date: String,
    pub pickup_location: String,
    pub return_location: String,
    pub vehicle_type: String,
    pub days: i64,
    pub daily_rate: f64,
    pub estimated_cost: f64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransturBookingInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub pickup_date: Option<String>,
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub return_location: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransturStatistics {
    pub total_bookings: usize,
    pub confirmed_bookings: usize,
    pub pending_bookings: usize,
    pub error_bookings: usize,
    pub success_rate: f64,
    pub total_income: f64,
    pub average_booking_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub reachable: bool,
    pub status: Option<u16>,
    pub elapsed_ms: u128,
    pub error: Option<String>,
}

/// USD per day by Transtur vehicle class.
pub fn daily_rate(vehicle_type: &str) -> f64 {
    match vehicle_type.trim().to_lowercase().as_str() {
        "economico" | "económico" => 45.0,
        "intermedio" => 60.0,
        "suv" => 85.0,
        "lujo" => 120.0,
        _ => 55.0,
    }
}

/// Whole rental days between pickup and return; return must come after pickup.
pub fn rental_days(pickup: &str, ret: &str) -> Result<i64, AdminError> {
    let parse = |field: &str, value: &str| {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
            AdminError::bad_request(format!("{field} must be a date in YYYY-MM-DD format"))
        })
    };
    let from = parse("pickup_date", pickup)?;
    let to = parse("return_date", ret)?;
    let days = (to - from).num_days();
    if days <= 0 {
        return Err(AdminError::bad_request("return_date must be after pickup_date"));
    }
    Ok(days)
}

pub fn transtur_statistics(bookings: &[TransturBooking]) -> TransturStatistics {
    let count = |status: &str| bookings.iter().filter(|b| b.status == status).count();
    let confirmed = count("confirmed");
    let total = bookings.len();
    let total_income: f64 = bookings
        .iter()
        .filter(|b| b.status == "confirmed")
        .map(|b| b.estimated_cost)
        .sum();

    TransturStatistics {
        total_bookings: total,
        confirmed_bookings: confirmed,
        pending_bookings: count("pending"),
        error_bookings: count("error"),
        success_rate: if total > 0 {
            confirmed as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        total_income,
        average_booking_value: if confirmed > 0 {
            total_income / confirmed as f64
        } else {
            0.0
        },
    }
}

fn parse_routes(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn seed_airlines() -> BTreeMap<String, CharterAirline> {
    let seed = |id: &str, name: &str, url: &str, markup: f64| CharterAirline {
        id: id.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        markup,
        active: true,
        routes: vec!["Miami-Havana".to_string()],
        check_frequency: 30,
    };
    [
        seed("xael", "Xael Charter", "https://www.xaelcharter.com", 50.0),
        seed("cubazul", "Cubazul Air Charter", "https://www.cubazulaircharter.com", 45.0),
        seed("havana_air", "Havana Air", "https://www.havanaair.com", 40.0),
    ]
    .into_iter()
    .map(|a| (a.id.clone(), a))
    .collect()
}

pub struct PartnersDesk {
    http: Client,
    transtur_url: String,
    airlines: RwLock<BTreeMap<String, CharterAirline>>,
    charter_bookings: RwLock<Vec<CharterBooking>>,
    transtur_bookings: RwLock<Vec<TransturBooking>>,
    charter_seq: AtomicU64,
}

impl PartnersDesk {
    pub fn new(cfg: &settings::Partners) -> Result<Self, AdminError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.probe_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            transtur_url: cfg.transtur_url.clone(),
            airlines: RwLock::new(seed_airlines()),
            charter_bookings: RwLock::new(Vec::new()),
            transtur_bookings: RwLock::new(Vec::new()),
            charter_seq: AtomicU64::new(1),
        })
    }

    async fn probe(&self, url: &str) -> ProbeResult {
        let started = Instant::now();
        let outcome = self.http.get(url).send().await;
        let elapsed_ms = started.elapsed().as_millis();
        match outcome {
            Ok(resp) => ProbeResult {
                url: url.to_string(),
                reachable: !resp.status().is_server_error(),
                status: Some(resp.status().as_u16()),
                elapsed_ms,
                error: None,
            },
            Err(e) => {
                tracing::warn!(url, error = %e, "partner probe failed");
                ProbeResult {
                    url: url.to_string(),
                    reachable: false,
                    status: None,
                    elapsed_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    // Charter airlines

    pub async fn airlines(&self) -> Vec<CharterAirline> {
        self.airlines.read().await.values().cloned().collect()
    }

    /// Updates the airline with a known id, otherwise registers a new one.
    pub async fn save_airline(&self, input: CharterAirlineInput) -> Result<CharterAirline, AdminError> {
        require(&[("name", present(&input.name)), ("url", present(&input.url))])?;
        let name = input.name.clone().unwrap_or_default();
        let id = input
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slug(&name));
        let active = input
            .active
            .or_else(|| input.status.as_deref().map(|s| s == "active"));

        let mut airlines = self.airlines.write().await;
        let airline = airlines.entry(id.clone()).or_insert_with(|| CharterAirline {
            id,
            name: String::new(),
            url: String::new(),
            markup: 0.0,
            active: true,
            routes: Vec::new(),
            check_frequency: 30,
        });
        airline.name = name;
        airline.url = input.url.unwrap_or_default();
        if let Some(markup) = input.markup {
            airline.markup = markup;
        }
        if let Some(active) = active {
            airline.active = active;
        }
        if let Some(routes) = &input.routes {
            airline.routes = parse_routes(routes);
        }
        if let Some(freq) = input.check_frequency {
            airline.check_frequency = freq;
        }
        tracing::info!(airline = %airline.id, "charter airline saved");
        Ok(airline.clone())
    }

    pub async fn toggle_airline(&self, id: &str) -> Result<CharterAirline, AdminError> {
        let mut airlines = self.airlines.write().await;
        let airline = airlines
            .get_mut(id)
            .ok_or_else(|| AdminError::not_found("Airline not found"))?;
        airline.active = !airline.active;
        Ok(airline.clone())
    }

    pub async fn test_airline(&self, id: &str) -> Result<ProbeResult, AdminError> {
        let url = self
            .airlines
            .read()
            .await
            .get(id)
            .map(|a| a.url.clone())
            .ok_or_else(|| AdminError::not_found("Airline not found"))?;
        Ok(self.probe(&url).await)
    }

    // Charter bookings

    pub async fn charter_bookings(&self) -> Vec<CharterBooking> {
        self.charter_bookings.read().await.clone()
    }

    pub async fn create_charter_booking(
        &self,
        input: CharterBookingInput,
    ) -> Result<CharterBooking, AdminError> {
        require(&[
            ("passenger_name", present(&input.passenger_name)),
            ("origin", present(&input.origin)),
            ("destination", present(&input.destination)),
            ("departure_date", present(&input.departure_date)),
        ])?;
        let booking = CharterBooking {
            id: format!("CH{:03}", self.charter_seq.fetch_add(1, Ordering::SeqCst)),
            passenger_name: input.passenger_name.unwrap_or_default(),
            origin: input.origin.unwrap_or_default(),
            destination: input.destination.unwrap_or_default(),
            departure_date: input.departure_date.unwrap_or_default(),
            airline: input.airline,
            status: "PENDIENTE".to_string(),
            total_price: input.total_price.unwrap_or(0.0),
            created_at: Utc::now().to_rfc3339(),
            can_modify: true,
            can_cancel: true,
        };
        self.charter_bookings.write().await.push(booking.clone());
        Ok(booking)
    }

    /// Confirms the booking and issues the ticket; it can no longer change.
    pub async fn confirm_charter_booking(&self, id: &str) -> Result<CharterBooking, AdminError> {
        let mut bookings = self.charter_bookings.write().await;
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AdminError::not_found("Booking not found"))?;
        booking.status = "CONFIRMADO".to_string();
        booking.can_modify = false;
        booking.can_cancel = false;
        tracing::info!(booking = id, "charter booking confirmed");
        Ok(booking.clone())
    }

    // Cuba Transtur

    pub async fn transtur_bookings(&self) -> Vec<TransturBooking> {
        self.transtur_bookings.read().await.clone()
    }

    pub async fn create_transtur_booking(
        &self,
        input: TransturBookingInput,
    ) -> Result<TransturBooking, AdminError> {
        require(&[
            ("name", present(&input.name)),
            ("phone", present(&input.phone)),
            ("pickup_date", present(&input.pickup_date)),
            ("return_date", present(&input.return_date)),
            ("pickup_location", present(&input.pickup_location)),
            ("vehicle_type", present(&input.vehicle_type)),
        ])?;
        let pickup_date = input.pickup_date.unwrap_or_default();
        let return_date = input.return_date.unwrap_or_default();
        let vehicle_type = input.vehicle_type.unwrap_or_default();
        let pickup_location = input.pickup_location.unwrap_or_default();

        let days = rental_days(&pickup_date, &return_date)?;
        let rate = daily_rate(&vehicle_type);

        let booking = TransturBooking {
            id: format!("CT-{}", &random_id()[..10]),
            name: input.name.unwrap_or_default(),
            phone: input.phone.unwrap_or_default(),
            email: input.email,
            return_location: input
                .return_location
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| pickup_location.clone()),
            pickup_location,
            pickup_date,
            return_date,
            vehicle_type,
            days,
            daily_rate: rate,
            estimated_cost: rate * days as f64,
            status: "pending".to_string(),
            notes: input.notes,
            created_at: Utc::now().to_rfc3339(),
        };
        tracing::info!(booking = %booking.id, days, "Transtur booking registered");
        self.transtur_bookings.write().await.push(booking.clone());
        Ok(booking)
    }

    pub async fn transtur_booking(&self, id: &str) -> Result<TransturBooking, AdminError> {
        self.transtur_bookings
            .read()
            .await
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| AdminError::not_found("Booking not found"))
    }

    pub async fn transtur_statistics(&self) -> TransturStatistics {
        transtur_statistics(&self.transtur_bookings.read().await)
    }

    pub async fn test_transtur(&self) -> ProbeResult {
        let url = self.transtur_url.clone();
        self.probe(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn desk() -> PartnersDesk {
        PartnersDesk::new(&settings::Partners::default()).unwrap()
    }

    fn transtur_input() -> TransturBookingInput {
        TransturBookingInput {
            name: Some("Luis".into()),
            phone: Some("+53 5555 5555".into()),
            pickup_date: Some("2026-12-01".into()),
            return_date: Some("2026-12-05".into()),
            pickup_location: Some("Aeropuerto José Martí".into()),
            vehicle_type: Some("suv".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_rental_days() {
        assert_eq!(rental_days("2026-12-01", "2026-12-05").unwrap(), 4);
        assert!(rental_days("2026-12-05", "2026-12-05").is_err());
        assert!(rental_days("2026-12-05", "2026-12-01").is_err());
        assert!(rental_days("01/12/2026", "2026-12-05").is_err());
    }

    #[test]
    fn test_daily_rates() {
        assert_eq!(daily_rate("Economico"), 45.0);
        assert_eq!(daily_rate("lujo"), 120.0);
        assert_eq!(daily_rate("minivan"), 55.0);
    }

    #[test]
    fn test_parse_routes() {
        assert_eq!(
            parse_routes(&json!("Miami-Havana, Miami-Santa Clara,")),
            vec!["Miami-Havana", "Miami-Santa Clara"]
        );
        assert_eq!(parse_routes(&json!(["A-B"])), vec!["A-B"]);
    }

    #[tokio::test]
    async fn test_seeded_airlines_toggle() {
        let desk = desk();
        assert_eq!(desk.airlines().await.len(), 3);

        let toggled = desk.toggle_airline("xael").await.unwrap();
        assert!(!toggled.active);
        assert!(matches!(
            desk.toggle_airline("nope").await.unwrap_err(),
            AdminError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_save_airline_updates_or_inserts() {
        let desk = desk();
        let updated = desk
            .save_airline(CharterAirlineInput {
                id: Some("cubazul".into()),
                name: Some("Cubazul".into()),
                url: Some("https://cubazul.test".into()),
                status: Some("inactive".into()),
                routes: Some(json!("Miami-Havana,Tampa-Havana")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!updated.active);
        assert_eq!(updated.routes.len(), 2);
        assert_eq!(updated.markup, 45.0);

        let inserted = desk
            .save_airline(CharterAirlineInput {
                name: Some("Sky High".into()),
                url: Some("https://skyhigh.test".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(inserted.id, "sky_high");
        assert_eq!(desk.airlines().await.len(), 4);

        assert!(desk
            .save_airline(CharterAirlineInput {
                name: Some("No url".into()),
                ..Default::default()
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_airline_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let desk = desk();
        desk.save_airline(CharterAirlineInput {
            id: Some("xael".into()),
            name: Some("Xael".into()),
            url: Some(server.uri()),
            ..Default::default()
        })
        .await
        .unwrap();

        let probe = desk.test_airline("xael").await.unwrap();
        assert!(probe.reachable);
        assert_eq!(probe.status, Some(200));
        assert!(desk.test_airline("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_charter_booking_confirmation_locks_booking() {
        let desk = desk();
        let booking = desk
            .create_charter_booking(CharterBookingInput {
                passenger_name: Some("Juan Pérez".into()),
                origin: Some("Miami".into()),
                destination: Some("Havana".into()),
                departure_date: Some("2026-11-20".into()),
                total_price: Some(300.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(booking.id, "CH001");
        assert_eq!(booking.status, "PENDIENTE");

        let confirmed = desk.confirm_charter_booking("CH001").await.unwrap();
        assert_eq!(confirmed.status, "CONFIRMADO");
        assert!(!confirmed.can_modify && !confirmed.can_cancel);
        assert!(desk.confirm_charter_booking("CH999").await.is_err());
    }

    #[tokio::test]
    async fn test_transtur_booking_and_statistics() {
        let desk = desk();
        let booking = desk.create_transtur_booking(transtur_input()).await.unwrap();
        assert!(booking.id.starts_with("CT-"));
        assert_eq!(booking.days, 4);
        assert_eq!(booking.estimated_cost, 340.0);
        assert_eq!(booking.return_location, "Aeropuerto José Martí");

        assert_eq!(desk.transtur_booking(&booking.id).await.unwrap(), booking);
        assert!(matches!(
            desk.transtur_booking("CT-unknown").await.unwrap_err(),
            AdminError::NotFound(_)
        ));

        let stats = desk.transtur_statistics().await;
        assert_eq!(stats.total_bookings, 1);
        assert_eq!(stats.pending_bookings, 1);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_transtur_booking_requires_fields() {
        let desk = desk();
        let mut input = transtur_input();
        input.phone = None;
        let err = desk.create_transtur_booking(input).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: phone");
    }

    #[test]
    fn test_statistics_math() {
        let mk = |status: &str, cost: f64| TransturBooking {
            id: "x".into(),
            name: "n".into(),
            phone: "p".into(),
            email: None,
            pickup_date: "2026-01-01".into(),
            return_date: "2026-01-02".into(),
            pickup_location: "a".into(),
            return_location: "a".into(),
            vehicle_type: "suv".into(),
            days: 1,
            daily_rate: cost,
            estimated_cost: cost,
            status: status.into(),
            notes: None,
            created_at: String::new(),
        };
        let stats = transtur_statistics(&[
            mk("confirmed", 100.0),
            mk("confirmed", 200.0),
            mk("error", 50.0),
            mk("pending", 70.0),
        ]);
        assert_eq!(stats.confirmed_bookings, 2);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.total_income, 300.0);
        assert_eq!(stats.average_booking_value, 150.0);
    }
}
