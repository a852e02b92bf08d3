//! Local SQLite mirror used when Supabase is unreachable, plus admin sessions.

use crate::entities;
use crate::errors::AdminError;
use crate::models::{BannerInput, ProductInput, UserInput, VehicleInput};
use crate::settings::Database as DbCfg;
use crate::signing::random_id;
use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub daily_price: f64,
    pub transmission: Option<String>,
    pub passenger_capacity: i64,
    pub air_conditioning: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub photos: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    pub session_id: String,
    pub username: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub user_agent: Option<String>,
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, AdminError> {
    let db = Database::connect(&cfg.url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}

// Products

pub async fn list_products(
    db: &DatabaseConnection,
) -> Result<Vec<entities::product::Model>, AdminError> {
    use entities::product::{Column, Entity};

    Ok(Entity::find().order_by_desc(Column::Id).all(db).await?)
}

pub async fn create_product(
    db: &DatabaseConnection,
    input: &ProductInput,
) -> Result<entities::product::Model, AdminError> {
    input.validate()?;
    let now = Utc::now().timestamp();

    let product = entities::product::ActiveModel {
        name: Set(input.name.clone().unwrap_or_default()),
        description: Set(input.description.clone()),
        price: Set(input.price.unwrap_or_default()),
        category: Set(input.category.clone()),
        image_url: Set(input.image_url.clone()),
        stock: Set(input.stock.unwrap_or(0)),
        is_active: Set(flag(input.is_active.unwrap_or(true))),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(product.insert(db).await?)
}

pub async fn update_product(
    db: &DatabaseConnection,
    id: i64,
    input: &ProductInput,
) -> Result<entities::product::Model, AdminError> {
    use entities::product::Entity;

    input.validate()?;
    let model = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("Product {id} not found")))?;
    let mut active = model.into_active_model();

    if let Some(name) = &input.name {
        active.name = Set(name.clone());
    }
    if input.description.is_some() {
        active.description = Set(input.description.clone());
    }
    if let Some(price) = input.price {
        active.price = Set(price);
    }
    if input.category.is_some() {
        active.category = Set(input.category.clone());
    }
    if input.image_url.is_some() {
        active.image_url = Set(input.image_url.clone());
    }
    if let Some(stock) = input.stock {
        active.stock = Set(stock);
    }
    if let Some(is_active) = input.is_active {
        active.is_active = Set(flag(is_active));
    }
    active.updated_at = Set(Utc::now().timestamp());

    Ok(active.update(db).await?)
}

pub async fn delete_product(db: &DatabaseConnection, id: i64) -> Result<u64, AdminError> {
    use entities::product::Entity;

    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected)
}

/// Distinct non-empty categories of local products, sorted.
pub async fn product_categories(db: &DatabaseConnection) -> Result<Vec<String>, AdminError> {
    let mut categories: Vec<String> = list_products(db)
        .await?
        .into_iter()
        .filter_map(|p| p.category)
        .filter(|c| !c.trim().is_empty())
        .collect();
    categories.sort();
    categories.dedup();
    Ok(categories)
}

// Banners

pub async fn list_banners(
    db: &DatabaseConnection,
) -> Result<Vec<entities::banner::Model>, AdminError> {
    use entities::banner::{Column, Entity};

    Ok(Entity::find()
        .order_by_asc(Column::Position)
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

pub async fn list_active_banners(
    db: &DatabaseConnection,
) -> Result<Vec<entities::banner::Model>, AdminError> {
    use entities::banner::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::IsActive.eq(1))
        .order_by_asc(Column::Position)
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

pub async fn create_banner(
    db: &DatabaseConnection,
    input: &BannerInput,
) -> Result<entities::banner::Model, AdminError> {
    let banner = entities::banner::ActiveModel {
        title: Set(input.title.clone()),
        image_url: Set(input.image_url.clone()),
        link_url: Set(input.link_url.clone()),
        is_active: Set(flag(input.is_active.unwrap_or(true))),
        position: Set(input.position.unwrap_or(0)),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };

    Ok(banner.insert(db).await?)
}

pub async fn update_banner(
    db: &DatabaseConnection,
    id: i64,
    input: &BannerInput,
) -> Result<entities::banner::Model, AdminError> {
    use entities::banner::Entity;

    let model = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("Banner {id} not found")))?;
    let mut active = model.into_active_model();

    if input.title.is_some() {
        active.title = Set(input.title.clone());
    }
    if input.image_url.is_some() {
        active.image_url = Set(input.image_url.clone());
    }
    if input.link_url.is_some() {
        active.link_url = Set(input.link_url.clone());
    }
    if let Some(is_active) = input.is_active {
        active.is_active = Set(flag(is_active));
    }
    if let Some(position) = input.position {
        active.position = Set(position);
    }

    Ok(active.update(db).await?)
}

pub async fn set_banner_active(
    db: &DatabaseConnection,
    id: i64,
    is_active: bool,
) -> Result<entities::banner::Model, AdminError> {
    update_banner(
        db,
        id,
        &BannerInput {
            is_active: Some(is_active),
            ..Default::default()
        },
    )
    .await
}

/// Flips the active flag of a banner and returns the new row.
pub async fn toggle_banner(
    db: &DatabaseConnection,
    id: i64,
) -> Result<entities::banner::Model, AdminError> {
    use entities::banner::Entity;

    let current = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("Banner {id} not found")))?;
    set_banner_active(db, id, current.is_active == 0).await
}

pub async fn delete_banner(db: &DatabaseConnection, id: i64) -> Result<u64, AdminError> {
    use entities::banner::Entity;

    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected)
}

// App users

pub async fn list_users(
    db: &DatabaseConnection,
) -> Result<Vec<entities::app_user::Model>, AdminError> {
    use entities::app_user::{Column, Entity};

    Ok(Entity::find().order_by_desc(Column::Id).all(db).await?)
}

pub async fn create_user(
    db: &DatabaseConnection,
    input: &UserInput,
) -> Result<entities::app_user::Model, AdminError> {
    input.validate_new()?;

    let user = entities::app_user::ActiveModel {
        email: Set(input.email.clone().unwrap_or_default()),
        name: Set(input.name.clone().unwrap_or_default()),
        phone: Set(input.phone.clone()),
        blocked: Set(flag(input.blocked.unwrap_or(false))),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };

    Ok(user.insert(db).await?)
}

pub async fn update_user(
    db: &DatabaseConnection,
    id: i64,
    input: &UserInput,
) -> Result<entities::app_user::Model, AdminError> {
    use entities::app_user::Entity;

    let model = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("User {id} not found")))?;
    let mut active = model.into_active_model();

    if let Some(email) = &input.email {
        active.email = Set(email.clone());
    }
    if let Some(name) = &input.name {
        active.name = Set(name.clone());
    }
    if input.phone.is_some() {
        active.phone = Set(input.phone.clone());
    }
    if let Some(blocked) = input.blocked {
        active.blocked = Set(flag(blocked));
    }

    Ok(active.update(db).await?)
}

pub async fn toggle_user_block(
    db: &DatabaseConnection,
    id: i64,
) -> Result<entities::app_user::Model, AdminError> {
    use entities::app_user::Entity;

    let current = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AdminError::not_found(format!("User {id} not found")))?;
    update_user(
        db,
        id,
        &UserInput {
            blocked: Some(current.blocked == 0),
            ..Default::default()
        },
    )
    .await
}

pub async fn delete_user(db: &DatabaseConnection, id: i64) -> Result<u64, AdminError> {
    use entities::app_user::Entity;

    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected)
}

/// Counts one search for `user_id` and stamps `last_seen`.
pub async fn record_user_activity(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<entities::user_activity::Model, AdminError> {
    use entities::user_activity::{Column, Entity};

    let now = Utc::now().timestamp();
    let activity = entities::user_activity::ActiveModel {
        user_id: Set(user_id.to_string()),
        searches: Set(1),
        last_seen: Set(now),
    };

    Entity::insert(activity)
        .on_conflict(
            OnConflict::column(Column::UserId)
                .value(Column::Searches, Expr::col(Column::Searches).add(1))
                .update_column(Column::LastSeen)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Entity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AdminError::Other(format!("activity row for {user_id} vanished")))
}

pub async fn total_searches(db: &DatabaseConnection) -> Result<i64, AdminError> {
    use entities::user_activity::Entity;

    Ok(Entity::find()
        .all(db)
        .await?
        .iter()
        .map(|a| a.searches)
        .sum())
}

// Vehicles

impl TryFrom<entities::vehicle::Model> for Vehicle {
    type Error = AdminError;

    fn try_from(m: entities::vehicle::Model) -> Result<Self, Self::Error> {
        Ok(Vehicle {
            id: m.id,
            name: m.name,
            category: m.category,
            daily_price: m.daily_price,
            transmission: m.transmission,
            passenger_capacity: m.passenger_capacity,
            air_conditioning: m.air_conditioning,
            description: m.description,
            features: serde_json::from_str(&m.features)?,
            photos: serde_json::from_str(&m.photos)?,
            created_at: m.created_at,
        })
    }
}

pub async fn list_vehicles(db: &DatabaseConnection) -> Result<Vec<Vehicle>, AdminError> {
    use entities::vehicle::{Column, Entity};

    Entity::find()
        .order_by_desc(Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Vehicle::try_from)
        .collect()
}

pub async fn get_vehicle(db: &DatabaseConnection, id: i64) -> Result<Option<Vehicle>, AdminError> {
    use entities::vehicle::Entity;

    Entity::find_by_id(id)
        .one(db)
        .await?
        .map(Vehicle::try_from)
        .transpose()
}

pub async fn create_vehicle(
    db: &DatabaseConnection,
    input: &VehicleInput,
) -> Result<Vehicle, AdminError> {
    input.validate_new()?;

    let vehicle = entities::vehicle::ActiveModel {
        name: Set(input.name.clone().unwrap_or_default()),
        category: Set(input.category.clone().unwrap_or_default()),
        daily_price: Set(input.daily_price.unwrap_or_default()),
        transmission: Set(input.transmission.clone()),
        passenger_capacity: Set(input.passenger_capacity.unwrap_or(0)),
        air_conditioning: Set(input.air_conditioning.clone()),
        description: Set(input.description.clone()),
        features: Set(serde_json::to_string(&input.features)?),
        photos: Set(serde_json::to_string(&input.photos)?),
        created_at: Set(Utc::now().timestamp()),
        ..Default::default()
    };

    vehicle.insert(db).await?.try_into()
}

pub async fn delete_vehicle(db: &DatabaseConnection, id: i64) -> Result<u64, AdminError> {
    use entities::vehicle::Entity;

    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected)
}

// Admin sessions

pub async fn create_admin_session(
    db: &DatabaseConnection,
    username: &str,
    ttl_secs: i64,
    user_agent: Option<String>,
) -> Result<AdminSession, AdminError> {
    let session_id = random_id();
    let now = Utc::now().timestamp();
    let expires_at = now + ttl_secs;

    let session = entities::admin_session::ActiveModel {
        session_id: Set(session_id.clone()),
        username: Set(username.to_string()),
        created_at: Set(now),
        expires_at: Set(expires_at),
        user_agent: Set(user_agent.clone()),
    };

    session.insert(db).await?;

    Ok(AdminSession {
        session_id,
        username: username.to_string(),
        created_at: now,
        expires_at,
        user_agent,
    })
}

pub async fn get_admin_session(
    db: &DatabaseConnection,
    session_id: &str,
) -> Result<Option<AdminSession>, AdminError> {
    use entities::admin_session::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::SessionId.eq(session_id))
        .one(db)
        .await?
    {
        let now = Utc::now().timestamp();
        if now > model.expires_at {
            return Ok(None);
        }

        Ok(Some(AdminSession {
            session_id: model.session_id,
            username: model.username,
            created_at: model.created_at,
            expires_at: model.expires_at,
            user_agent: model.user_agent,
        }))
    } else {
        Ok(None)
    }
}

pub async fn delete_admin_session(
    db: &DatabaseConnection,
    session_id: &str,
) -> Result<(), AdminError> {
    use entities::admin_session::{Column, Entity};

    Entity::delete_many()
        .filter(Column::SessionId.eq(session_id))
        .exec(db)
        .await?;

    Ok(())
}

pub async fn cleanup_expired_admin_sessions(db: &DatabaseConnection) -> Result<u64, AdminError> {
    use entities::admin_session::{Column, Entity};

    let now = Utc::now().timestamp();
    let result = Entity::delete_many()
        .filter(Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
