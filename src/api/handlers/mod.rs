//! HTTP request handlers organized by resource type

pub mod data;
pub mod health;

pub use data::{
    delete_by_name_handler, generate_handler, get_by_id_handler, list_by_name_handler,
    set_handler, NameQuery, SecretList,
};
pub use health::{health_handler, HealthResponse};
