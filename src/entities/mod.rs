pub mod admin_session;
pub mod app_user;
pub mod banner;
pub mod product;
pub mod user_activity;
pub mod vehicle;

pub use admin_session::Entity as AdminSession;
pub use app_user::Entity as AppUser;
pub use banner::Entity as Banner;
pub use product::Entity as Product;
pub use user_activity::Entity as UserActivity;
pub use vehicle::Entity as Vehicle;
