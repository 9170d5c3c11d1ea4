use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use basic_cleaning_core::store::{ArtifactRef, ArtifactStore, PublishRequest};
use basic_cleaning_core::{pipeline, CleaningConfig, CleaningError, LocalArtifactStore};
use tempfile::TempDir;

const LISTINGS: &str = "\
id,name,neighbourhood_group,price,minimum_nights,last_review,reviews_per_month
2539,Clean & quiet apt home by the park,Brooklyn,149,1,2018-10-19,0.21
2595,Skylit Midtown Castle,Manhattan,225,1,2019-05-21,0.38
3647,THE VILLAGE OF HARLEM,Manhattan,150,3,,
3831,Cozy Entire Floor of Brownstone,Brooklyn,89,1,2019-07-05,4.64
5022,Entire Apt: Spacious Studio/Loft,Manhattan,80,10,not a date,0.10
5099,Large Cozy 1 BR Apartment,Manhattan,200,3,2019-06-22,0.59
5121,BlissArtsSpace!,Brooklyn,9,45,2017-10-05,0.40
5178,Large Furnished Room Near B'way,Manhattan,79,2,2019-06-24,3.47
5203,Cozy Clean Guest Room - Family Apt,Manhattan,10000,2,2017-07-21,0.99
";

struct Fixture {
    _dir: TempDir,
    work: PathBuf,
    store: LocalArtifactStore,
}

impl Fixture {
    fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let work = dir.path().join("work");
        fs::create_dir_all(&work)?;
        let store = LocalArtifactStore::new(dir.path().join("artifacts"));
        Ok(Self {
            _dir: dir,
            work,
            store,
        })
    }

    fn upload_raw(&self, contents: &str) -> Result<()> {
        let path = self.work.join("sample.csv");
        fs::write(&path, contents)?;
        self.store.publish(PublishRequest::new(
            "sample.csv",
            "raw_data",
            "Raw listings export",
            &path,
        ))?;
        Ok(())
    }

    fn config(&self, min_price: f64, max_price: f64) -> CleaningConfig {
        CleaningConfig {
            input_artifact: "sample.csv:latest".into(),
            output_artifact: "clean_sample.csv".into(),
            output_type: "clean_sample".into(),
            output_description: "Data with price outliers removed".into(),
            min_price,
            max_price,
            output_file: self.work.join("clean_sample.csv"),
        }
    }
}

fn read_rows(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

fn column<'a>(headers: &[String], rows: &'a [Vec<String>], name: &str) -> Vec<&'a str> {
    let idx = headers
        .iter()
        .position(|header| header == name)
        .expect("column present");
    rows.iter().map(|row| row[idx].as_str()).collect()
}

#[test]
fn keeps_only_rows_inside_price_bounds() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw(LISTINGS)?;

    let report = pipeline::run(&fixture.store, &fixture.config(10.0, 350.0))?;
    assert_eq!(report.rows_read, 9);
    assert_eq!(report.rows_kept, 7);

    let (headers, rows) = read_rows(&report.output_file)?;
    assert_eq!(
        headers,
        [
            "id",
            "name",
            "neighbourhood_group",
            "price",
            "minimum_nights",
            "last_review",
            "reviews_per_month"
        ]
    );
    assert_eq!(rows.len(), 7);

    for price in column(&headers, &rows, "price") {
        let value: f64 = price.parse()?;
        assert!((10.0..=350.0).contains(&value), "price {value} out of bounds");
    }

    let ids = column(&headers, &rows, "id");
    assert_eq!(ids, ["2539", "2595", "3647", "3831", "5022", "5099", "5178"]);
    Ok(())
}

#[test]
fn last_review_is_a_date_or_empty() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw(LISTINGS)?;

    let report = pipeline::run(&fixture.store, &fixture.config(10.0, 350.0))?;
    assert_eq!(report.reviews_missing, 2);

    let (headers, rows) = read_rows(&report.output_file)?;
    let reviews = column(&headers, &rows, "last_review");
    assert_eq!(
        reviews,
        ["2018-10-19", "2019-05-21", "", "2019-07-05", "", "2019-06-22", "2019-06-24"]
    );
    for review in reviews.into_iter().filter(|value| !value.is_empty()) {
        chrono::NaiveDate::parse_from_str(review, "%Y-%m-%d")?;
    }
    Ok(())
}

#[test]
fn drops_the_outlier_and_parses_the_survivor() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw("price,last_review\n50,2019-01-01\n999999,\n")?;

    let report = pipeline::run(&fixture.store, &fixture.config(10.0, 1000.0))?;
    let (_, rows) = read_rows(&report.output_file)?;
    assert_eq!(rows, vec![vec!["50".to_string(), "2019-01-01".to_string()]]);
    Ok(())
}

#[test]
fn whitespace_around_a_price_keeps_the_row() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw("price,last_review\n\" 50\",2019-01-01\n\"60 \",2019-01-02\n70,2019-01-03\n")?;

    let report = pipeline::run(&fixture.store, &fixture.config(10.0, 1000.0))?;
    assert_eq!(report.rows_read, 3);
    assert_eq!(report.rows_kept, 3);

    let (headers, rows) = read_rows(&report.output_file)?;
    let prices: Vec<f64> = column(&headers, &rows, "price")
        .into_iter()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(prices, vec![50.0, 60.0, 70.0]);
    Ok(())
}

#[test]
fn inverted_bounds_produce_an_empty_dataset() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw(LISTINGS)?;

    let report = pipeline::run(&fixture.store, &fixture.config(500.0, 10.0))?;
    assert_eq!(report.rows_kept, 0);

    let (headers, rows) = read_rows(&report.output_file)?;
    assert_eq!(headers.len(), 7);
    assert!(rows.is_empty());
    Ok(())
}

#[test]
fn rerunning_is_idempotent() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw(LISTINGS)?;
    let config = fixture.config(10.0, 350.0);

    let first = pipeline::run(&fixture.store, &config)?;
    let first_contents = fs::read(&first.output_file)?;
    let second = pipeline::run(&fixture.store, &config)?;
    let second_contents = fs::read(&second.output_file)?;

    assert_eq!(first_contents, second_contents);
    assert_eq!(first.output.digest, second.output.digest);
    assert_eq!(first.output.version, second.output.version);
    Ok(())
}

#[test]
fn cleaning_the_cleaned_output_changes_nothing() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw(LISTINGS)?;
    let first = pipeline::run(&fixture.store, &fixture.config(10.0, 350.0))?;

    let mut again = fixture.config(10.0, 350.0);
    again.input_artifact = "clean_sample.csv:latest".into();
    again.output_artifact = "clean_sample_again.csv".into();
    again.output_file = fixture.work.join("again.csv");
    let second = pipeline::run(&fixture.store, &again)?;

    assert_eq!(fs::read(&first.output_file)?, fs::read(&second.output_file)?);
    Ok(())
}

#[test]
fn output_manifest_records_lineage_and_config() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw(LISTINGS)?;

    let report = pipeline::run(&fixture.store, &fixture.config(10.0, 350.0))?;
    let output = &report.output;
    assert_eq!(output.name, "clean_sample.csv");
    assert_eq!(output.artifact_type, "clean_sample");
    assert_eq!(output.description, "Data with price outliers removed");
    assert_eq!(output.inputs, vec![report.input.reference()]);
    assert_eq!(output.inputs[0].to_string(), "sample.csv:v0");
    assert_eq!(output.metadata["job_type"], "basic_cleaning");
    assert_eq!(output.metadata["config"]["max_price"], 350.0);

    let fetched = fixture.store.fetch(&"clean_sample.csv:v0".parse::<ArtifactRef>()?)?;
    assert_eq!(fs::read(fetched.path)?, fs::read(&report.output_file)?);
    Ok(())
}

#[test]
fn unknown_input_is_artifact_not_found() -> Result<()> {
    let fixture = Fixture::new()?;
    let err = pipeline::run(&fixture.store, &fixture.config(10.0, 350.0)).unwrap_err();
    assert!(matches!(err, CleaningError::ArtifactNotFound(_)));
    Ok(())
}

#[test]
fn non_numeric_price_is_malformed_input() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw("price,last_review\n50,2019-01-01\nexpensive,2019-02-01\n")?;

    let err = pipeline::run(&fixture.store, &fixture.config(10.0, 350.0)).unwrap_err();
    assert!(matches!(err, CleaningError::MalformedInput(_)));
    assert!(!fixture.work.join("clean_sample.csv").exists());
    Ok(())
}

#[test]
fn missing_last_review_column_is_malformed_input() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw("id,price\n1,50\n")?;

    let err = pipeline::run(&fixture.store, &fixture.config(10.0, 350.0)).unwrap_err();
    assert!(matches!(err, CleaningError::MalformedInput(_)));
    Ok(())
}

#[test]
fn publishing_over_a_different_type_is_a_publish_error() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.upload_raw(LISTINGS)?;

    let mut config = fixture.config(10.0, 350.0);
    config.output_artifact = "sample.csv".into();
    let err = pipeline::run(&fixture.store, &config).unwrap_err();
    assert!(matches!(err, CleaningError::PublishError(_)));
    Ok(())
}
