//! A per-pixel linear classifier.
//!
//! A single 1x1 convolution from RGB to class logits. It is the smallest
//! network that satisfies the predictor contract and is used for smoke runs
//! and for checkpoints exported as per-pixel linear classifiers.

use std::path::Path;

use burn::{
    nn::conv::{Conv2d, Conv2dConfig},
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::Backend,
};

use crate::{
    error::{AnomalyEvalError, AnomalyEvalResult},
    predictor::{Predictor, PredictorSpec},
};

/// Configuration for [`LinearHead`].
#[derive(Config, Debug)]
pub struct LinearHeadConfig {
    /// Number of in-distribution classes.
    pub num_classes: usize,
    /// Number of input image channels.
    #[config(default = 3)]
    pub in_channels: usize,
    /// Append a void channel after the class channels.
    #[config(default = false)]
    pub void_channel: bool,
}

impl LinearHeadConfig {
    /// Total number of output channels.
    pub const fn output_channels(&self) -> usize {
        self.num_classes + self.void_channel as usize
    }

    /// Initialize a new [`LinearHead`] with random weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearHead<B> {
        LinearHead {
            conv: Conv2dConfig::new([self.in_channels, self.output_channels()], [1, 1])
                .init(device),
        }
    }
}

/// 1x1 convolution segmentation head.
#[derive(Module, Debug)]
pub struct LinearHead<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> LinearHead<B> {
    /// Registry identifier.
    pub const IDENTIFIER: &'static str = "linear-head";

    /// `[batch, in_channels, H, W]` -> `[batch, classes, H, W]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(images)
    }

    /// Loads weights saved with a named MessagePack recorder.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::WeightLoadingFailed`] if the record cannot
    /// be read or does not match the configured shape.
    pub fn load_weights(self, path: &Path, device: &B::Device) -> AnomalyEvalResult<Self> {
        let record = NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(path.to_path_buf(), device)
            .map_err(|e| AnomalyEvalError::WeightLoadingFailed {
                reason: format!("{}: {e:?}", path.display()),
            })?;
        Ok(self.load_record(record))
    }

    /// Registry constructor.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured weights cannot be loaded.
    pub fn construct(
        spec: &PredictorSpec,
        device: &B::Device,
    ) -> AnomalyEvalResult<Box<dyn Predictor<B>>> {
        let config = LinearHeadConfig::new(spec.num_classes).with_void_channel(spec.void_channel);
        let model = match &spec.weights {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading weights");
                config.init(device).load_weights(path, device)?
            }
            None => {
                tracing::warn!("no weights given, using a randomly initialised linear head");
                config.init(device)
            }
        };

        Ok(Box::new(LinearHeadPredictor {
            model,
            in_channels: config.in_channels,
            void_channel: spec.void_channel,
        }))
    }
}

/// [`LinearHead`] exposed through the [`Predictor`] capability.
#[derive(Debug)]
pub struct LinearHeadPredictor<B: Backend> {
    model: LinearHead<B>,
    in_channels: usize,
    void_channel: bool,
}

impl<B: Backend> Predictor<B> for LinearHeadPredictor<B> {
    fn predict(&self, image: Tensor<B, 3>) -> AnomalyEvalResult<Tensor<B, 3>> {
        let [channels, height, width] = image.dims();
        if channels != self.in_channels {
            return Err(AnomalyEvalError::ShapeMismatch {
                expected: format!("[{}, H, W]", self.in_channels),
                actual: format!("[{channels}, {height}, {width}]"),
            });
        }
        Ok(self.model.forward(image.unsqueeze::<4>()).squeeze::<3>(0))
    }

    fn has_void_channel(&self) -> bool {
        self.void_channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn output_has_one_channel_per_class_plus_void() {
        let device = Default::default();
        let spec = PredictorSpec::new(19).with_void_channel(true);
        let predictor = LinearHead::<TestBackend>::construct(&spec, &device).unwrap();

        let logits = predictor
            .predict(Tensor::zeros([3, 8, 16], &device))
            .unwrap();
        assert_eq!(logits.dims(), [20, 8, 16]);
        assert!(predictor.has_void_channel());
    }

    #[test]
    fn grayscale_input_is_rejected() {
        let device = Default::default();
        let predictor =
            LinearHead::<TestBackend>::construct(&PredictorSpec::new(4), &device).unwrap();

        assert!(matches!(
            predictor.predict(Tensor::zeros([1, 8, 8], &device)),
            Err(AnomalyEvalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn saved_weights_are_loaded_back() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let config = LinearHeadConfig::new(5);
        let model = config.init::<TestBackend>(&device);
        let image = Tensor::<TestBackend, 3>::random(
            [3, 4, 4],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let expected = model
            .forward(image.clone().unsqueeze::<4>())
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        model.save_file(dir.path().join("head"), &recorder).unwrap();

        let spec = PredictorSpec::new(5).with_weights(Some(dir.path().join("head.mpk")));
        let predictor = LinearHead::<TestBackend>::construct(&spec, &device).unwrap();
        let actual = predictor
            .predict(image)
            .unwrap()
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert_eq!(actual.len(), expected.len());
        for (a, b) in actual.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn missing_weights_file_fails() {
        let device = Default::default();
        let spec = PredictorSpec::new(5).with_weights(Some("does/not/exist.mpk".into()));

        assert!(matches!(
            LinearHead::<TestBackend>::construct(&spec, &device),
            Err(AnomalyEvalError::WeightLoadingFailed { .. })
        ));
    }
}
