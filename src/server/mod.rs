//! Server module for building HTTP servers with generated model routes

pub mod builder;
pub mod handlers;
pub mod routes;

pub use builder::ServerBuilder;
pub use handlers::ModelState;
pub use routes::{DEFAULT_PREFIX, ModelRest, route};
