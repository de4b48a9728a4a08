pub mod models;
pub mod providers;
pub mod session;

pub use cartalog_client as client;
