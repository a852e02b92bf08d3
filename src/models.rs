//! Typed request payloads. Remote rows stay loosely typed JSON; these
//! structs only pin down the fields the handlers validate or reshape.

use crate::errors::AdminError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accepts `12.5`, `"12.5"` or null.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {s}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

pub(crate) fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Fails with the first field name in `fields` whose value is absent or blank.
pub fn require(fields: &[(&str, bool)]) -> Result<(), AdminError> {
    match fields.iter().find(|(_, ok)| !ok) {
        Some((name, _)) => Err(AdminError::bad_request(format!(
            "Missing required field: {name}"
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ProductInput {
    /// Creates and updates alike must carry a name and a price.
    pub fn validate(&self) -> Result<(), AdminError> {
        require(&[("name", present(&self.name)), ("price", self.price.is_some())])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BannerInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
}

impl UserInput {
    pub fn validate_new(&self) -> Result<(), AdminError> {
        require(&[("email", present(&self.email)), ("name", present(&self.name))])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub daily_price: Option<f64>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub passenger_capacity: Option<i64>,
    #[serde(default)]
    pub air_conditioning: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    /// Photo URLs; uploads are handled elsewhere
    #[serde(default)]
    pub photos: Vec<String>,
}

impl VehicleInput {
    pub fn validate_new(&self) -> Result<(), AdminError> {
        require(&[
            ("name", present(&self.name)),
            ("category", present(&self.category)),
            ("daily_price", self.daily_price.is_some()),
        ])?;
        match self.daily_price {
            Some(p) if p > 0.0 => Ok(()),
            _ => Err(AdminError::bad_request("daily_price must be greater than 0")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, alias = "urgent")]
    pub is_urgent: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightSearchInput {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub departure_date: Option<String>,
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default)]
    pub passengers: Option<u32>,
    #[serde(default)]
    pub airline_type: Option<String>,
}

impl FlightSearchInput {
    pub fn validate(&self) -> Result<(), AdminError> {
        require(&[
            ("origin", present(&self.origin)),
            ("destination", present(&self.destination)),
            ("departure_date", present(&self.departure_date)),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentInput {
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

impl PaymentInput {
    pub fn validate(&self) -> Result<(), AdminError> {
        if self.nonce.is_some() {
            require(&[
                ("nonce", present(&self.nonce)),
                ("amount", self.amount.is_some()),
                ("location_id", present(&self.location_id)),
            ])?;
        } else {
            require(&[
                ("amount", self.amount.is_some()),
                ("email", present(&self.email)),
            ])?;
        }
        match self.amount {
            Some(a) if a > 0.0 => Ok(()),
            _ => Err(AdminError::bad_request("amount must be greater than 0")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundInput {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusInput {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusInput {
    pub fn required(self) -> Result<String, AdminError> {
        require(&[("status", present(&self.status))])?;
        Ok(self.status.unwrap_or_default())
    }
}
