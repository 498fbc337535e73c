pub mod analysis;
pub mod events;
pub mod models;
pub mod state;
pub mod upload;
