pub mod analysis;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;

pub mod utils {
    pub mod json;
}
