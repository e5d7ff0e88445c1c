pub mod calibration;
pub mod confidence;
pub mod config;
pub mod error;
pub mod form;
pub mod history;
pub mod league_params;
pub mod outcome;
pub mod poisson;
pub mod predict;
pub mod provider;
pub mod sample;
pub mod strength;

pub use config::ModelParams;
pub use error::PredictError;
pub use form::TeamForm;
pub use predict::{
    PredictionResult, VenueForms, predict, predict_with_provider, predict_with_venue_forms,
};
