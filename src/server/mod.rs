mod auth;
pub mod dto;
mod images;
mod posts;
mod projects;
pub mod response;
mod router;
mod users;

pub use router::{AppState, create_router};
