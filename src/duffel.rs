//! Duffel v2 flight offers and airport lookup, reshaped for the mobile app.

use crate::errors::AdminError;
use crate::settings;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const OFFER_LIMIT: usize = 20;
const AIRPORT_LIMIT: usize = 20;

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Offer {
    pub id: String,
    pub total_amount: Option<String>,
    pub total_currency: Option<String>,
    pub slices: Vec<OfferSlice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OfferSlice {
    pub duration: Option<String>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Segment {
    pub departing_at: Option<String>,
    pub arriving_at: Option<String>,
    pub marketing_carrier: Option<Carrier>,
    pub origin: Option<Place>,
    pub destination: Option<Place>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Carrier {
    pub name: Option<String>,
    pub iata_code: Option<String>,
    pub logo_symbol_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Place {
    pub iata_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Airport {
    pub iata_code: Option<String>,
    pub name: Option<String>,
    pub city_name: Option<String>,
    pub iata_country_code: Option<String>,
    pub time_zone: Option<String>,
}

/// Flight card as the app renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub airline: String,
    pub airline_code: String,
    pub airline_logo: String,
    #[serde(rename = "departureTime")]
    pub departure_time: String,
    #[serde(rename = "arrivalTime")]
    pub arrival_time: String,
    pub duration: String,
    pub stops: usize,
    pub price: f64,
    pub currency: String,
    pub origin_airport: String,
    pub destination_airport: String,
}

impl FlightOffer {
    /// First slice and first segment drive the card; offers without either are dropped.
    pub fn from_offer(offer: Offer, origin: &str, destination: &str) -> Option<Self> {
        let slice = offer.slices.into_iter().next()?;
        let stops = slice.segments.len().checked_sub(1)?;
        let segment = slice.segments.into_iter().next()?;
        let carrier = segment.marketing_carrier.unwrap_or_default();

        Some(FlightOffer {
            id: offer.id,
            airline: carrier.name.unwrap_or_else(|| "Aerolínea".to_string()),
            airline_code: carrier.iata_code.unwrap_or_default(),
            // Android cannot render the SVG variant
            airline_logo: carrier
                .logo_symbol_url
                .map(|u| u.replace(".svg", ".png"))
                .unwrap_or_default(),
            departure_time: segment.departing_at.unwrap_or_default(),
            arrival_time: segment.arriving_at.unwrap_or_default(),
            duration: slice.duration.unwrap_or_default(),
            stops,
            price: offer
                .total_amount
                .as_deref()
                .and_then(|a| a.parse().ok())
                .unwrap_or(0.0),
            currency: offer.total_currency.unwrap_or_else(|| "USD".to_string()),
            origin_airport: segment
                .origin
                .and_then(|p| p.iata_code)
                .unwrap_or_else(|| origin.to_string()),
            destination_airport: segment
                .destination
                .and_then(|p| p.iata_code)
                .unwrap_or_else(|| destination.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportSummary {
    pub iata_code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub time_zone: String,
}

impl From<Airport> for AirportSummary {
    fn from(a: Airport) -> Self {
        AirportSummary {
            iata_code: a.iata_code.unwrap_or_default(),
            name: a.name.unwrap_or_default(),
            city: a.city_name.unwrap_or_default(),
            country: a.iata_country_code.unwrap_or_default(),
            time_zone: a.time_zone.unwrap_or_default(),
        }
    }
}

/// Case-insensitive containment on IATA code, name or city.
pub fn matches_airport(airport: &Airport, query: &str) -> bool {
    let q = query.to_lowercase();
    [&airport.iata_code, &airport.name, &airport.city_name]
        .iter()
        .any(|field| {
            field
                .as_deref()
                .map(|v| v.to_lowercase().contains(&q))
                .unwrap_or(false)
        })
}

#[derive(Debug, Clone, Serialize)]
pub struct AirlineInfo {
    pub code: &'static str,
    pub name: &'static str,
}

pub fn airlines() -> Vec<AirlineInfo> {
    [
        ("AA", "American Airlines"),
        ("LA", "LATAM Airlines"),
        ("CM", "Copa Airlines"),
        ("DL", "Delta Air Lines"),
        ("UA", "United Airlines"),
        ("AC", "Air Canada"),
        ("CU", "Cubana de Aviación"),
    ]
    .into_iter()
    .map(|(code, name)| AirlineInfo { code, name })
    .collect()
}

#[derive(Clone, Debug)]
pub struct DuffelClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl DuffelClient {
    pub fn new(cfg: &settings::Duffel) -> Result<Self, AdminError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, AdminError> {
        if !self.is_configured() {
            return Err(AdminError::NotConfigured("DUFFEL_API_KEY"));
        }
        Ok(req
            .header("Accept", "application/json")
            .header("Duffel-Version", "v2")
            .bearer_auth(&self.api_key))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, AdminError> {
        let response = self.authorized(req)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdminError::Upstream {
                service: "Duffel",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// Creates an economy offer request for `passengers` adults and lists its offers.
    pub async fn search_offers(
        &self,
        origin: &str,
        destination: &str,
        departure_date: &str,
        passengers: u32,
    ) -> Result<Vec<FlightOffer>, AdminError> {
        #[derive(Deserialize)]
        struct OfferRequest {
            id: String,
        }

        let body = json!({
            "data": {
                "slices": [{
                    "origin": origin,
                    "destination": destination,
                    "departure_date": departure_date,
                }],
                "passengers": vec![json!({"type": "adult"}); passengers.max(1) as usize],
                "cabin_class": "economy",
            }
        });

        let request: OfferRequest = self
            .send(
                self.http
                    .post(format!("{}/air/offer_requests", self.base_url))
                    .json(&body),
            )
            .await?;

        let offers: Vec<Offer> = self
            .send(self.http.get(format!("{}/air/offers", self.base_url)).query(&[
                ("offer_request_id", request.id),
                ("limit", OFFER_LIMIT.to_string()),
            ]))
            .await?;

        let flights: Vec<FlightOffer> = offers
            .into_iter()
            .filter_map(|o| FlightOffer::from_offer(o, origin, destination))
            .collect();
        tracing::info!(origin, destination, count = flights.len(), "Duffel offers fetched");
        Ok(flights)
    }

    pub async fn search_airports(&self, query: &str) -> Result<Vec<AirportSummary>, AdminError> {
        let airports: Vec<Airport> = self
            .send(self.http.get(format!("{}/air/airports", self.base_url)).query(&[
                ("search", query.to_string()),
                ("limit", AIRPORT_LIMIT.to_string()),
            ]))
            .await?;

        Ok(airports
            .into_iter()
            .filter(|a| matches_airport(a, query))
            .map(AirportSummary::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offer_json() -> Value {
        json!({
            "id": "off_1",
            "total_amount": "245.30",
            "total_currency": "USD",
            "slices": [{
                "duration": "PT1H10M",
                "segments": [
                    {
                        "departing_at": "2026-11-01T08:00:00",
                        "arriving_at": "2026-11-01T09:10:00",
                        "marketing_carrier": {
                            "name": "American Airlines",
                            "iata_code": "AA",
                            "logo_symbol_url": "https://assets.duffel.com/img/airlines/AA.svg"
                        },
                        "origin": {"iata_code": "MIA"},
                        "destination": {"iata_code": "HAV"}
                    },
                    {"departing_at": "2026-11-01T10:00:00"}
                ]
            }]
        })
    }

    #[test]
    fn test_offer_reshaping() {
        let offer: Offer = serde_json::from_value(offer_json()).unwrap();
        let flight = FlightOffer::from_offer(offer, "MIA", "HAV").unwrap();

        assert_eq!(flight.airline_code, "AA");
        assert_eq!(
            flight.airline_logo,
            "https://assets.duffel.com/img/airlines/AA.png"
        );
        assert_eq!(flight.stops, 1);
        assert_eq!(flight.price, 245.30);

        let v = serde_json::to_value(&flight).unwrap();
        assert_eq!(v["departureTime"], "2026-11-01T08:00:00");
        assert_eq!(v["arrivalTime"], "2026-11-01T09:10:00");
    }

    #[test]
    fn test_offer_without_segments_is_dropped() {
        let offer: Offer =
            serde_json::from_value(json!({"id": "off_2", "slices": [{"segments": []}]})).unwrap();
        assert!(FlightOffer::from_offer(offer, "MIA", "HAV").is_none());

        let offer: Offer = serde_json::from_value(json!({"id": "off_3"})).unwrap();
        assert!(FlightOffer::from_offer(offer, "MIA", "HAV").is_none());
    }

    #[test]
    fn test_matches_airport() {
        let airport: Airport = serde_json::from_value(json!({
            "iata_code": "HAV",
            "name": "José Martí International Airport",
            "city_name": "Havana"
        }))
        .unwrap();
        assert!(matches_airport(&airport, "hav"));
        assert!(matches_airport(&airport, "MARTÍ"));
        assert!(!matches_airport(&airport, "miami"));
    }

    #[test]
    fn test_static_airlines() {
        let list = airlines();
        assert_eq!(list.len(), 7);
        assert!(list.iter().any(|a| a.code == "CU"));
    }

    fn client_for(server: &MockServer) -> DuffelClient {
        DuffelClient::new(&settings::Duffel {
            api_key: "duffel_test".into(),
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_offers_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/air/offer_requests"))
            .and(header("Duffel-Version", "v2"))
            .and(header("authorization", "Bearer duffel_test"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "orq_1"}})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/air/offers"))
            .and(query_param("offer_request_id", "orq_1"))
            .and(query_param("limit", "20"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [offer_json(), {"id": "empty"}]})),
            )
            .mount(&server)
            .await;

        let flights = client_for(&server)
            .search_offers("MIA", "HAV", "2026-11-01", 2)
            .await
            .unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].id, "off_1");
    }

    #[tokio::test]
    async fn test_search_airports_filters_locally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air/airports"))
            .and(query_param("search", "hav"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"iata_code": "HAV", "name": "José Martí", "city_name": "Havana", "iata_country_code": "CU", "time_zone": "America/Havana"},
                {"iata_code": "MIA", "name": "Miami International", "city_name": "Miami", "iata_country_code": "US"}
            ]})))
            .mount(&server)
            .await;

        let airports = client_for(&server).search_airports("hav").await.unwrap();
        assert_eq!(airports.len(), 1);
        assert_eq!(airports[0].country, "CU");
        assert_eq!(airports[0].time_zone, "America/Havana");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = DuffelClient::new(&settings::Duffel::default()).unwrap();
        let err = client.search_airports("hav").await.unwrap_err();
        assert!(matches!(err, AdminError::NotConfigured(_)));
    }
}
