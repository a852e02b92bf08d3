use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub category: String,
    pub daily_price: f64,
    pub transmission: Option<String>,
    pub passenger_capacity: i64,
    pub air_conditioning: Option<String>,
    pub description: Option<String>,
    pub features: String, // JSON-encoded Vec<String>
    pub photos: String,   // JSON-encoded Vec<String>
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
