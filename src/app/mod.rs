pub mod catalog;
pub mod config;
pub mod executor;

pub use config::{API_KEY_ENV, ModelApiConfig};
pub use executor::{FlowExecutor, Stage};
