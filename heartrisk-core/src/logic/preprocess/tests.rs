use super::pipeline::{FittedPipeline, PreprocessingPipeline, RawRow};
use super::storage::{load_pipeline, save_pipeline};
use super::PreprocessError;
use crate::logic::features::layout::{layout_hash, schema};
use crate::logic::features::vector::FeatureVector;

fn row(values: [f64; 13]) -> RawRow {
    values.map(Some)
}

// male, age, education, currentsmoker, cigsperday, bpmeds, prevalentstroke,
// prevalenthyp, diabetes, totchol, bmi, heartrate, glucose
fn training_rows() -> Vec<RawRow> {
    let mut missing_age = row([0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 260.0, 27.0, 85.0, 110.0]);
    missing_age[1] = None;

    vec![
        row([1.0, 40.0, 1.0, 1.0, 10.0, 0.0, 0.0, 0.0, 0.0, 200.0, 25.0, 70.0, 80.0]),
        row([0.0, 50.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 240.0, 30.0, 80.0, 90.0]),
        row([1.0, 60.0, 3.0, 1.0, 20.0, 1.0, 0.0, 1.0, 1.0, 220.0, 28.0, 75.0, 100.0]),
        missing_age,
    ]
}

fn fitted() -> FittedPipeline {
    PreprocessingPipeline::from_schema(schema()).fit(&training_rows()).unwrap()
}

#[test]
fn test_column_roles_and_output_layout() {
    let pipeline = fitted();

    assert_eq!(pipeline.numeric.len(), 7);
    assert_eq!(pipeline.categorical.len(), 6);
    // prevalentstroke only ever saw 0 → one indicator
    assert_eq!(pipeline.output_dim(), 18);

    let names = pipeline.feature_names_out();
    assert_eq!(names.len(), pipeline.output_dim());
    assert_eq!(&names[..7], &["age", "education", "cigsperday", "totchol", "bmi", "heartrate", "glucose"]);
    assert_eq!(&names[7..9], &["male_0", "male_1"]);
    assert_eq!(names[13], "prevalentstroke_0");
}

#[test]
fn test_numeric_mean_imputation_and_scaling() {
    let pipeline = fitted();
    let age = &pipeline.numeric[0];

    assert_eq!(age.name, "age");
    assert_eq!(age.impute_value, 50.0);
    assert_eq!(age.mean, 50.0);
    assert!((age.scale - 50.0f64.sqrt()).abs() < 1e-12);

    // Missing age imputes to the mean, which scales to zero
    let out = pipeline.transform_row(&training_rows()[3]);
    assert_eq!(out[0], 0.0);
}

#[test]
fn test_one_hot_scaled_without_centering() {
    let pipeline = fitted();
    let male = &pipeline.categorical[0];

    assert_eq!(male.categories, vec![0.0, 1.0]);
    assert_eq!(male.scales, vec![0.5, 0.5]);

    let out = pipeline.transform_row(&training_rows()[0]);
    assert_eq!(out[7], 0.0);
    assert_eq!(out[8], 2.0);
}

#[test]
fn test_categorical_mode_imputation() {
    let mut rows = training_rows();
    rows[0][8] = None; // diabetes: remaining 0, 0, 1 → mode 0

    let pipeline = PreprocessingPipeline::from_schema(schema()).fit(&rows).unwrap();
    let diabetes = pipeline.categorical.iter().find(|c| c.name == "diabetes").unwrap();
    assert_eq!(diabetes.impute_value, 0.0);
}

#[test]
fn test_unseen_category_maps_to_zero_block() {
    let pipeline = fitted();

    let mut unseen = training_rows()[0];
    unseen[5] = Some(0.5); // bpmeds
    unseen[6] = Some(1.0); // prevalentstroke never seen as 1

    let out = pipeline.transform_row(&unseen);
    assert_eq!(out[11], 0.0);
    assert_eq!(out[12], 0.0);
    assert_eq!(out[13], 0.0);
}

#[test]
fn test_transform_is_idempotent() {
    let pipeline = fitted();
    let rows = training_rows();

    let first = pipeline.transform(&rows);
    let second = pipeline.transform(&rows);
    assert_eq!(first, second);
    assert_eq!(first.dim(), (4, 18));
}

#[test]
fn test_transform_vector_matches_row_transform() {
    let pipeline = fitted();
    let values = [1.0, 45.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 230.0, 26.0, 72.0, 85.0];

    let from_vector = pipeline.transform_vector(&FeatureVector::from_values(values));
    let from_row = pipeline.transform_row(&row(values));
    assert_eq!(from_vector.row(0), from_row);
}

#[test]
fn test_fit_rejects_empty_dataset() {
    let result = PreprocessingPipeline::from_schema(schema()).fit(&[]);
    assert!(matches!(result, Err(PreprocessError::EmptyDataset)));
}

#[test]
fn test_fit_rejects_unobserved_column() {
    let mut rows = training_rows();
    for r in rows.iter_mut() {
        r[12] = None;
    }

    match PreprocessingPipeline::from_schema(schema()).fit(&rows) {
        Err(PreprocessError::NoObservedValues(name)) => assert_eq!(name, "glucose"),
        other => panic!("Expected NoObservedValues, got {:?}", other),
    }
}

#[test]
fn test_save_load_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifacts").join("preprocessor.json");

    let original = fitted();
    save_pipeline(&original, &path).unwrap();

    let loaded = load_pipeline(&path).unwrap();
    assert_eq!(loaded, original);

    let rows = training_rows();
    assert_eq!(loaded.transform(&rows), original.transform(&rows));
}

#[test]
fn test_load_rejects_layout_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preprocessor.json");

    let mut stale = fitted();
    stale.layout_hash = !layout_hash();
    save_pipeline(&stale, &path).unwrap();

    assert!(matches!(load_pipeline(&path), Err(PreprocessError::LayoutMismatch(_))));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_pipeline(&dir.path().join("nope.json"));
    assert!(matches!(result, Err(PreprocessError::Io(_))));
}

#[test]
fn test_fitted_pipeline_verifies() {
    assert!(fitted().verify(schema()).is_ok());
}

#[test]
fn test_load_rejects_inconsistent_pipelines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preprocessor.json");

    let tampered: [fn(&mut FittedPipeline); 8] = [
        |p| {
            p.categorical[0].scales.pop();
        },
        |p| p.numeric[0].index = 40,
        |p| p.categorical[1].index = p.categorical[0].index,
        |p| p.numeric[0].name = "male".to_string(),
        |p| p.numeric[2].scale = 0.0,
        |p| p.categorical[2].scales[0] = -1.0,
        |p| p.categorical[0].categories.reverse(),
        |p| {
            p.numeric.pop();
        },
    ];

    for (case, tamper) in tampered.into_iter().enumerate() {
        let mut pipeline = fitted();
        tamper(&mut pipeline);
        save_pipeline(&pipeline, &path).unwrap();

        match load_pipeline(&path) {
            Err(PreprocessError::Malformed(_)) => {}
            other => panic!("case {}: expected Malformed, got {:?}", case, other),
        }
    }
}
