//! Predictor capability and the model registry.
//!
//! The evaluation core only needs `image -> logits`. Concrete networks are
//! registered under an identifier so the pipeline never depends on them
//! directly.

use std::{collections::BTreeMap, path::PathBuf};

use burn::{prelude::*, tensor::backend::Backend};

use crate::{
    error::{AnomalyEvalError, AnomalyEvalResult},
    models::LinearHead,
};

/// A semantic segmentation predictor.
pub trait Predictor<B: Backend> {
    /// Produces raw class logits `[classes, height, width]` for an RGB image
    /// `[3, height, width]`.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn predict(&self, image: Tensor<B, 3>) -> AnomalyEvalResult<Tensor<B, 3>>;

    /// Whether the last output channel is a dedicated void class.
    fn has_void_channel(&self) -> bool {
        false
    }
}

impl<B: Backend, P: Predictor<B> + ?Sized> Predictor<B> for Box<P> {
    fn predict(&self, image: Tensor<B, 3>) -> AnomalyEvalResult<Tensor<B, 3>> {
        (**self).predict(image)
    }

    fn has_void_channel(&self) -> bool {
        (**self).has_void_channel()
    }
}

/// Parameters handed to a predictor constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorSpec {
    /// Number of in-distribution classes.
    pub num_classes: usize,
    /// Whether an extra void channel follows the class channels.
    pub void_channel: bool,
    /// Optional weights file.
    pub weights: Option<PathBuf>,
}

impl PredictorSpec {
    pub const fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            void_channel: false,
            weights: None,
        }
    }

    #[must_use]
    pub fn with_void_channel(mut self, void_channel: bool) -> Self {
        self.void_channel = void_channel;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: Option<PathBuf>) -> Self {
        self.weights = weights;
        self
    }

    /// Total number of output channels.
    pub const fn output_channels(&self) -> usize {
        self.num_classes + self.void_channel as usize
    }
}

/// Builds a boxed predictor from a spec.
pub type PredictorConstructor<B> =
    fn(&PredictorSpec, &<B as Backend>::Device) -> AnomalyEvalResult<Box<dyn Predictor<B>>>;

/// Maps model identifiers to predictor constructors.
pub struct ModelRegistry<B: Backend> {
    constructors: BTreeMap<String, PredictorConstructor<B>>,
}

impl<B: Backend> Default for ModelRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> ModelRegistry<B> {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Creates a registry holding the predictors shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(LinearHead::<B>::IDENTIFIER, LinearHead::<B>::construct);
        registry
    }

    /// Registers `constructor` under `identifier`, replacing any previous entry.
    pub fn register(&mut self, identifier: impl Into<String>, constructor: PredictorConstructor<B>) {
        self.constructors.insert(identifier.into(), constructor);
    }

    /// Registered identifiers in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Builds the predictor registered under `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::UnknownModel`] for an unregistered
    /// identifier, or the constructor's error.
    pub fn build(
        &self,
        identifier: &str,
        spec: &PredictorSpec,
        device: &B::Device,
    ) -> AnomalyEvalResult<Box<dyn Predictor<B>>> {
        let constructor =
            self.constructors
                .get(identifier)
                .ok_or_else(|| AnomalyEvalError::UnknownModel {
                    model: identifier.to_owned(),
                    available: self.identifiers().collect::<Vec<_>>().join(", "),
                })?;
        tracing::info!(model = identifier, classes = spec.num_classes, void = spec.void_channel, "building predictor");
        constructor(spec, device)
    }
}
