//! Predictors shipped with the crate.

mod linear_head;

pub use linear_head::{LinearHead, LinearHeadConfig, LinearHeadPredictor, LinearHeadRecord};
