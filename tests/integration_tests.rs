//! Integration tests for the FTRL library
//!
//! These tests exercise the public API end to end: training, prediction,
//! sparsity under L1, persistence and error reporting.

use approx::assert_relative_eq;
use ftrl::api::{quick, FtrlProximal};
use ftrl::persistence;
use ftrl::utils::metrics;
use ftrl::{
    BinaryDataset, CsrBinaryMatrix, Dataset, FtrlError, FtrlParams, ModelType, Predictor,
    Shuffle,
};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

/// Linearly separable data: feature 0 means positive, feature 1 negative,
/// features 2..6 appear in both classes
fn separable_data() -> (CsrBinaryMatrix, Vec<f32>) {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..40u32 {
        let noise = 2 + (i / 2) % 4;
        if i % 2 == 0 {
            rows.push(vec![0, noise]);
            labels.push(1.0);
        } else {
            rows.push(vec![1, noise]);
            labels.push(0.0);
        }
    }
    let matrix = CsrBinaryMatrix::from_rows(&rows, 8).unwrap();
    (matrix, labels)
}

fn params(l1: f32, l2: f32) -> FtrlParams {
    FtrlParams::new(0.5, 1.0, l1, l2, ModelType::Classification).unwrap()
}

#[test]
fn test_complete_workflow() {
    let (matrix, labels) = separable_data();
    let mut model = FtrlProximal::new(params(0.0, 0.0));

    let loss = model.fit(&matrix, &labels, 5).unwrap();
    assert!(loss.is_finite());

    let predictions = model.predict(&matrix).unwrap();
    assert_eq!(predictions.len(), matrix.num_rows());
    for (p, y) in predictions.iter().zip(&labels) {
        assert_eq!(*p > 0.5, *y == 1.0);
    }

    let (intercept, weights) = model.weights().unwrap();
    assert!(intercept.is_finite());
    assert!(weights[0] > 0.0);
    assert!(weights[1] < 0.0);
    // columns 6 and 7 never occur
    assert_eq!(weights[6], 0.0);
    assert_eq!(weights[7], 0.0);
}

#[test]
fn test_more_passes_fit_better() {
    let (matrix, labels) = separable_data();

    let mut one_pass = FtrlProximal::new(params(0.0, 0.0));
    let loss_one = one_pass.fit(&matrix, &labels, 1).unwrap();

    let mut many_passes = FtrlProximal::new(params(0.0, 0.0));
    let loss_many = many_passes.fit(&matrix, &labels, 20).unwrap();

    assert!(
        loss_many < loss_one,
        "20 passes ({loss_many}) should beat 1 pass ({loss_one})"
    );

    let train_loss = |model: &FtrlProximal| {
        metrics::log_loss(&labels, &model.predict(&matrix).unwrap()).unwrap()
    };
    assert!(train_loss(&many_passes) < train_loss(&one_pass));
}

#[test]
fn test_l1_produces_sparsity() {
    let (matrix, labels) = separable_data();

    let zero_counts: Vec<usize> = [0.0, 1.0, 1e4]
        .iter()
        .map(|&l1| {
            let mut model = FtrlProximal::new(params(l1, 0.0));
            model.fit(&matrix, &labels, 5).unwrap();
            model.state().unwrap().num_zero_weights()
        })
        .collect();

    assert!(zero_counts.windows(2).all(|w| w[0] <= w[1]), "{zero_counts:?}");
    // two columns are never used
    assert_eq!(zero_counts[0], 2);
    assert_eq!(zero_counts[2], 8);
}

#[test]
fn test_huge_l1_predicts_from_intercept_only() {
    let (matrix, labels) = separable_data();
    let mut model = FtrlProximal::new(params(1e4, 0.0)).with_fit_intercept(false);
    model.fit(&matrix, &labels, 3).unwrap();

    for p in model.predict(&matrix).unwrap() {
        assert_relative_eq!(p, 0.5);
    }
}

#[test]
fn test_predictions_are_probabilities() {
    let (matrix, labels) = separable_data();
    let mut model = FtrlProximal::new(FtrlParams::new(
        10.0,
        0.1,
        0.0,
        0.0,
        ModelType::Classification,
    )
    .unwrap());
    model.fit(&matrix, &labels, 50).unwrap();

    for p in model.predict(&matrix).unwrap() {
        assert!(p > 0.0 && p < 1.0, "prediction {p} escaped (0, 1)");
    }
}

#[test]
fn test_regression_fits_targets() {
    let matrix =
        CsrBinaryMatrix::from_rows(&[vec![0], vec![1], vec![0, 1]], 2).unwrap();
    let targets = [1.0, 2.0, 3.0];
    let mut model = FtrlProximal::new(
        FtrlParams::new(0.5, 1.0, 0.0, 0.0, ModelType::Regression).unwrap(),
    );

    let loss_early = model.fit(&matrix, &targets, 1).unwrap();
    let loss_late = model.fit(&matrix, &targets, 100).unwrap();
    assert!(loss_late < loss_early);

    let predictions = model.predict(&matrix).unwrap();
    for (p, y) in predictions.iter().zip(&targets) {
        assert!((p - y).abs() < 0.5, "prediction {p} far from {y}");
    }
}

#[test]
fn test_save_load_round_trip() {
    let (matrix, labels) = separable_data();
    let mut model = FtrlProximal::new(params(0.1, 0.5)).with_shuffle(Shuffle::Seeded(3));
    model.fit(&matrix, &labels, 4).unwrap();

    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    model.save(temp_file.path()).expect("Failed to save model");
    let loaded = FtrlProximal::load(temp_file.path()).expect("Failed to load model");

    assert_eq!(loaded.params(), model.params());
    assert_eq!(loaded.state(), model.state());

    let original = model.predict(&matrix).unwrap();
    let restored = loaded.predict(&matrix).unwrap();
    let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&original), bits(&restored));
}

#[test]
fn test_loaded_model_continues_training() {
    let (matrix, labels) = separable_data();
    let mut model = FtrlProximal::new(params(0.0, 0.0));
    model.fit(&matrix, &labels, 2).unwrap();

    let mut bytes = Vec::new();
    persistence::write_model(model.state().unwrap(), &mut bytes).unwrap();
    let state = persistence::read_model(&mut Cursor::new(bytes)).unwrap();
    let mut resumed = FtrlProximal::from_state(state);

    model.fit(&matrix, &labels, 1).unwrap();
    resumed.fit(&matrix, &labels, 1).unwrap();
    assert_eq!(resumed.weights().unwrap(), model.weights().unwrap());
}

#[test]
fn test_corrupt_model_file() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(b"FTRX0000").expect("Failed to write");
    temp_file.flush().expect("Failed to flush");

    assert!(matches!(
        FtrlProximal::load(temp_file.path()),
        Err(FtrlError::DecodeError(_))
    ));
}

#[test]
fn test_out_of_range_column_is_rejected() {
    let (matrix, labels) = separable_data();
    let mut model = FtrlProximal::new(params(0.0, 0.0));
    model.fit(&matrix, &labels, 1).unwrap();
    let before = model.state().unwrap().clone();

    let wide = CsrBinaryMatrix::from_rows(&[vec![0, 8]], 9).unwrap();
    assert!(matches!(
        model.predict(&wide),
        Err(FtrlError::ShapeMismatch(_))
    ));
    assert!(matches!(
        model.fit(&wide, &[1.0], 1),
        Err(FtrlError::ShapeMismatch(_))
    ));
    assert_eq!(model.state().unwrap(), &before);
}

#[test]
fn test_label_errors() {
    let (matrix, _) = separable_data();
    let mut model = FtrlProximal::new(params(0.0, 0.0));

    let short_labels = vec![1.0; matrix.num_rows() - 1];
    assert!(matches!(
        model.fit(&matrix, &short_labels, 1),
        Err(FtrlError::ShapeMismatch(_))
    ));

    let signed_labels = vec![-1.0; matrix.num_rows()];
    assert!(matches!(
        model.fit(&matrix, &signed_labels, 1),
        Err(FtrlError::InvalidLabel(_))
    ));
}

#[test]
fn test_uninitialized_model() {
    let model = FtrlProximal::default();
    let (matrix, _) = separable_data();

    assert!(matches!(
        model.predict(&matrix),
        Err(FtrlError::ModelNotInitialized)
    ));
    assert!(matches!(
        model.weights(),
        Err(FtrlError::ModelNotInitialized)
    ));
}

#[test]
fn test_predictor_trait_on_state() {
    let (matrix, labels) = separable_data();
    let mut model = FtrlProximal::new(params(0.0, 0.0));
    model.fit(&matrix, &labels, 3).unwrap();

    let state = model.state().unwrap();
    let via_trait = state.predict_matrix(&matrix).unwrap();
    assert_eq!(via_trait, model.predict(&matrix).unwrap());
    assert_eq!(state.model_type(), ModelType::Classification);
}

#[test]
fn test_dataset_file_workflow() {
    let mut train_file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(train_file, "# label then active features").expect("Failed to write");
    for _ in 0..10 {
        writeln!(train_file, "1 1:1 3:1").expect("Failed to write");
        writeln!(train_file, "0 2:1 3:1").expect("Failed to write");
    }
    train_file.flush().expect("Failed to flush");

    let dataset = BinaryDataset::from_file(train_file.path()).expect("Failed to load dataset");
    assert_eq!(dataset.len(), 20);
    assert_eq!(dataset.dim(), 3);

    let mut model = FtrlProximal::new(params(0.0, 0.0));
    model.fit_dataset(&dataset, 5).unwrap();

    let metrics = model
        .evaluate_from_file(train_file.path())
        .expect("Evaluation should succeed");
    assert_eq!(metrics.num_examples, 20);
    assert_eq!(metrics.accuracy, Some(1.0));
    assert_eq!(metrics.auc, Some(1.0));

    let split = quick::evaluate_split(train_file.path(), train_file.path(), params(0.0, 0.0), 5)
        .expect("Quick evaluation should succeed");
    assert_eq!(split.accuracy, Some(1.0));
}
