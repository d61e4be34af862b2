//! End-to-end runs of the evaluation pipeline on synthetic predictors.

use burn::{backend::ndarray::NdArray, prelude::*};

use crate::{
    AnomalyEvalError, AnomalyEvalResult, AnomalyEvaluator, DatasetProfile, EvaluationConfig,
    ModelRegistry, Predictor, PredictorSpec, RawMask, ResultsLog, RunCounts, ScoringMethod,
};

type TestBackend = NdArray<f32>;

const HEIGHT: usize = 2;
const WIDTH: usize = 3;

/// Predicts the background class confidently except where the red channel is lit.
struct RedChannelPredictor {
    void_channel: bool,
}

impl Predictor<TestBackend> for RedChannelPredictor {
    fn predict(&self, image: Tensor<TestBackend, 3>) -> AnomalyEvalResult<Tensor<TestBackend, 3>> {
        let [_, height, width] = image.dims();
        let red = image.slice([0..1, 0..height, 0..width]);

        let mut channels = vec![
            red.clone().neg().add_scalar(1.0).mul_scalar(4.0),
            Tensor::zeros([1, height, width], &red.device()),
        ];
        if self.void_channel {
            channels.push(red.mul_scalar(2.0));
        }
        Ok(Tensor::cat(channels, 0))
    }

    fn has_void_channel(&self) -> bool {
        self.void_channel
    }
}

/// An RGB image whose red channel marks the anomalous pixels.
fn image(anomalous: &[bool]) -> Tensor<TestBackend, 3> {
    let device = Default::default();
    let red: Vec<f32> = anomalous.iter().map(|&a| if a { 1.0 } else { 0.0 }).collect();
    let red = Tensor::<TestBackend, 3>::from_data(TensorData::new(red, [1, HEIGHT, WIDTH]), &device);
    Tensor::cat(vec![red, Tensor::zeros([2, HEIGHT, WIDTH], &device)], 0)
}

/// RoadAnomaly encoding: 2 marks an anomaly.
fn road_anomaly_mask(anomalous: &[bool]) -> RawMask {
    let labels = anomalous.iter().map(|&a| if a { 2 } else { 0 }).collect();
    RawMask::new(labels, HEIGHT, WIDTH).unwrap()
}

fn config(method: ScoringMethod) -> EvaluationConfig {
    EvaluationConfig::new()
        .with_method(method)
        .with_target_size([HEIGHT, WIDTH])
        .with_profile(DatasetProfile::RoadAnomaly)
}

fn run<P: Predictor<TestBackend> + ?Sized>(
    config: &EvaluationConfig,
    predictor: &P,
    images: &[[bool; HEIGHT * WIDTH]],
) -> AnomalyEvalResult<(crate::EvaluationRecord, RunCounts)> {
    let mut evaluator = AnomalyEvaluator::new(config, predictor)?;
    for anomalous in images {
        evaluator.process(image(anomalous), &road_anomaly_mask(anomalous))?;
    }
    evaluator.finish()
}

const WITH_ANOMALY: [bool; 6] = [false, true, false, false, false, true];
const OTHER_ANOMALY: [bool; 6] = [true, false, false, false, false, false];
const CLEAN: [bool; 6] = [false; 6];

#[test]
fn every_method_separates_a_perfect_predictor() {
    let predictor = RedChannelPredictor { void_channel: true };

    for method in ScoringMethod::ALL {
        let (record, _) = run(&config(method.clone()), &predictor, &[WITH_ANOMALY, OTHER_ANOMALY])
            .unwrap();
        assert!(
            (record.auprc() - 100.0).abs() < 1e-9,
            "{}: AUPRC {}",
            method.as_str(),
            record.auprc()
        );
        assert!(
            record.fpr_at_95_tpr().abs() < 1e-9,
            "{}: FPR {}",
            method.as_str(),
            record.fpr_at_95_tpr()
        );
    }
}

#[test]
fn images_without_anomalies_are_dropped() {
    let predictor = RedChannelPredictor { void_channel: false };

    let (record, counts) = run(
        &config(ScoringMethod::Msp),
        &predictor,
        &[CLEAN, WITH_ANOMALY, CLEAN],
    )
    .unwrap();

    assert_eq!(
        counts,
        RunCounts {
            seen: 3,
            accepted: 1,
            dropped: 2
        }
    );
    // Only the accepted image contributes pixels.
    assert_eq!(record.labels().len(), HEIGHT * WIDTH);
    assert_eq!(record.labels(), &[0, 0, 0, 0, 1, 1]);
}

#[test]
fn run_without_any_anomaly_is_empty() {
    let predictor = RedChannelPredictor { void_channel: false };

    assert!(matches!(
        run(&config(ScoringMethod::Msp), &predictor, &[CLEAN, CLEAN]),
        Err(AnomalyEvalError::EmptyEvaluation)
    ));
}

#[test]
fn void_method_requires_a_void_channel() {
    let predictor = RedChannelPredictor { void_channel: false };
    let config = config(ScoringMethod::Void);

    assert!(matches!(
        AnomalyEvaluator::new(&config, &predictor),
        Err(AnomalyEvalError::InvalidConfiguration { .. })
    ));
}

#[test]
fn temperature_overrides_the_void_method() {
    let predictor = RedChannelPredictor { void_channel: false };
    let config = config(ScoringMethod::Void).with_temperature(2.0);

    let (record, _) = run(&config, &predictor, &[WITH_ANOMALY]).unwrap();
    assert!((record.auprc() - 100.0).abs() < 1e-9);
}

#[test]
fn negative_temperature_scales_instead_of_failing() {
    let predictor = RedChannelPredictor { void_channel: false };
    let config = config(ScoringMethod::Msp).with_temperature(-2.0);

    let (record, counts) = run(&config, &predictor, &[WITH_ANOMALY]).unwrap();
    assert_eq!(counts.accepted, 1);
    assert!((0.0..=100.0).contains(&record.auprc()));
}

#[test]
fn invalid_temperature_is_rejected_before_processing() {
    let predictor = RedChannelPredictor { void_channel: false };
    let config = config(ScoringMethod::Msp).with_temperature(f64::INFINITY);

    assert!(matches!(
        AnomalyEvaluator::new(&config, &predictor),
        Err(AnomalyEvalError::InvalidConfiguration { .. })
    ));
}

#[test]
fn wrongly_sized_predictions_fail_at_finish() {
    let predictor = RedChannelPredictor { void_channel: false };
    let config = config(ScoringMethod::Msp).with_target_size([HEIGHT, WIDTH + 1]);

    let mut evaluator = AnomalyEvaluator::new(&config, &predictor).unwrap();
    assert!(evaluator
        .process(image(&WITH_ANOMALY), &road_anomaly_mask(&WITH_ANOMALY))
        .unwrap());
    assert!(matches!(
        evaluator.finish(),
        Err(AnomalyEvalError::ShapeMismatch { .. })
    ));
}

#[test]
fn registry_predictor_runs_end_to_end_and_logs_results() {
    let device = Default::default();
    let predictor = ModelRegistry::<TestBackend>::with_builtin()
        .build("linear-head", &PredictorSpec::new(19), &device)
        .unwrap();

    let (record, counts) = run(
        &config(ScoringMethod::MaxLogit),
        &predictor,
        &[WITH_ANOMALY, CLEAN, OTHER_ANOMALY],
    )
    .unwrap();
    assert_eq!(counts.accepted, 2);
    assert!((0.0..=100.0).contains(&record.auprc()));
    assert!((0.0..=100.0).contains(&record.fpr_at_95_tpr()));

    let dir = tempfile::tempdir().unwrap();
    let log = ResultsLog::new(dir.path().join("results.txt"));
    log.append(&record).unwrap();

    let contents = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(contents, format!("{}\n", record.log_line()));
    assert!(contents.starts_with("AUPRC score: "));
}
