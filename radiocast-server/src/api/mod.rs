//! HTTP API handlers for radiocast-server

pub mod auth;
pub mod health;
pub mod radio;
pub mod schedule;

pub use auth::{login, require_admin, AuthService};
pub use health::health_check;
pub use radio::{get_metadata, stream_state};
pub use schedule::{
    create_asset, create_schedule_item, create_show, delete_schedule_item, get_asset,
    get_schedule_item, list_assets, list_schedule, update_schedule_item,
};
