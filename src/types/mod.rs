pub mod request;
pub mod water_ml;
