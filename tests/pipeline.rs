mod support;

use std::path::Path;

use caltree::config::{PrepareConfig, TrainConfig};
use caltree::dataset::DatasetSource;
use caltree::dataset::california::CaliforniaHousing;
use caltree::dataset::csv_io::read_table_csv;
use caltree::dataset::prepare::{PrepareError, TEST_FILE_NAME, TRAIN_FILE_NAME, prepare_dataset};
use caltree::dataset::synthetic::SyntheticSource;
use caltree::ml::export::TreeExport;
use caltree::ml::train::train_and_export;
use serde_json::Value;
use support::{caltree_env::CaltreeEnvGuard, raw_data::write_raw_housing};
use tempfile::tempdir;

const SOURCE: SyntheticSource = SyntheticSource {
    n_rows: 3000,
    seed: 99,
};

fn prepare_into(out_dir: &Path) -> PrepareConfig {
    let config = PrepareConfig {
        train_size: 1500,
        test_size: 300,
        out_dir: out_dir.to_path_buf(),
        ..PrepareConfig::default()
    };
    prepare_dataset(&SOURCE, &config).expect("prepare");
    config
}

fn train_from(data_dir: &Path, out_dir: &Path) -> TrainConfig {
    let config = TrainConfig {
        train_csv: data_dir.join(TRAIN_FILE_NAME),
        test_csv: Some(data_dir.join(TEST_FILE_NAME)),
        out_dir: out_dir.to_path_buf(),
        ..TrainConfig::default()
    };
    train_and_export(&config).expect("train");
    config
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).expect("read json")).expect("parse json")
}

#[test]
fn prepare_then_train_produces_consistent_outputs() {
    let temp = tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    let model_dir = temp.path().join("model");
    prepare_into(&data_dir);
    train_from(&data_dir, &model_dir);

    let train = read_table_csv(&data_dir.join(TRAIN_FILE_NAME), "MedHouseVal").expect("train csv");
    assert_eq!(train.n_rows(), 1500);

    let tree = read_json(&model_dir.join("tree.json"));
    assert_eq!(tree["root"], 0);
    let nodes = tree["nodes"].as_array().expect("nodes");
    assert_eq!(nodes[0]["nSamples"], 1500);
    for (idx, node) in nodes.iter().enumerate() {
        assert_eq!(node["id"], idx);
        if node["isLeaf"] == true {
            assert!(node.get("left").is_none() && node.get("feature").is_none());
            assert!(node["nSamples"].as_u64().expect("nSamples") >= 20);
        } else {
            let left = node["left"].as_u64().expect("left") as usize;
            let right = node["right"].as_u64().expect("right") as usize;
            assert!(left > idx && right > idx && left < nodes.len() && right < nodes.len());
            let feature_index = node["featureIndex"].as_u64().expect("featureIndex") as usize;
            assert_eq!(node["feature"], train.feature_names()[feature_index].as_str());
        }
    }

    let meta = read_json(&model_dir.join("meta.json"));
    assert_eq!(meta["target"], "MedHouseVal");
    assert_eq!(meta["nTrain"], 1500);
    assert_eq!(meta["params"]["max_depth"], 6);
    let names: Vec<&str> = meta["featureNames"]
        .as_array()
        .expect("featureNames")
        .iter()
        .map(|name| name.as_str().expect("name"))
        .collect();
    assert_eq!(names, train.feature_names());
    for stats in meta["featureStats"]
        .as_object()
        .expect("featureStats")
        .values()
        .chain(std::iter::once(&meta["targetStats"]))
    {
        let min = stats["min"].as_f64().expect("min");
        let median = stats["median"].as_f64().expect("median");
        let max = stats["max"].as_f64().expect("max");
        assert!(min <= median && median <= max);
    }
}

#[test]
fn exported_tree_predicts_like_the_training_leaves() {
    let temp = tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    let model_dir = temp.path().join("model");
    prepare_into(&data_dir);
    train_from(&data_dir, &model_dir);

    let export = TreeExport::load_json(&model_dir.join("tree.json")).expect("load tree");
    let test = read_table_csv(&data_dir.join(TEST_FILE_NAME), "MedHouseVal").expect("test csv");
    let leaf_values: Vec<f64> = export
        .nodes
        .iter()
        .filter(|node| node.is_leaf())
        .map(|node| node.value())
        .collect();
    for row in test.features().rows() {
        let row = row.to_vec();
        let predicted = export.predict(&row).expect("prediction");
        assert!(leaf_values.contains(&predicted));
    }
}

#[test]
fn same_seed_writes_byte_identical_files() {
    let first = tempdir().expect("tempdir");
    let second = tempdir().expect("tempdir");
    for dir in [first.path(), second.path()] {
        prepare_into(&dir.join("data"));
        train_from(&dir.join("data"), &dir.join("model"));
    }
    for file in [
        Path::new("data").join(TRAIN_FILE_NAME),
        Path::new("data").join(TEST_FILE_NAME),
        Path::new("model").join("tree.json"),
        Path::new("model").join("meta.json"),
    ] {
        let a = std::fs::read(first.path().join(&file)).expect("first");
        let b = std::fs::read(second.path().join(&file)).expect("second");
        assert_eq!(a, b, "{} differs", file.display());
    }
}

#[test]
fn oversized_request_fails_without_outputs() {
    let temp = tempdir().expect("tempdir");
    let out_dir = temp.path().join("data");
    let config = PrepareConfig {
        train_size: 2800,
        test_size: 201,
        out_dir: out_dir.clone(),
        ..PrepareConfig::default()
    };
    let err = prepare_dataset(&SOURCE, &config).expect_err("too many rows");
    assert!(matches!(err, PrepareError::Split(_)));
    assert!(!out_dir.exists());

    let exact = PrepareConfig {
        train_size: 2800,
        test_size: 200,
        ..config
    };
    let summary = prepare_dataset(&SOURCE, &exact).expect("exact fit");
    assert_eq!(summary.train_rows + summary.test_rows, 3000);
}

#[test]
fn california_source_reads_cached_data_offline() {
    let temp = tempdir().expect("tempdir");
    let data_home = temp.path().join("cache");
    std::fs::create_dir_all(&data_home).expect("cache dir");
    write_raw_housing(&data_home.join("cal_housing.data"), 1000);
    let _env = CaltreeEnvGuard::set_data_home(data_home);

    let source = CaliforniaHousing {
        download_if_missing: false,
        ..CaliforniaHousing::default()
    };
    let table = source.load().expect("load cached");
    assert_eq!(table.n_rows(), 1000);
    assert_eq!(table.target_name(), "MedHouseVal");

    let config = PrepareConfig {
        train_size: 600,
        test_size: 100,
        out_dir: temp.path().join("data"),
        download_if_missing: false,
        ..PrepareConfig::default()
    };
    let summary = prepare_dataset(&config.california_source(), &config).expect("prepare");
    assert_eq!(summary.train_rows, 600);
    let header = std::fs::read_to_string(&summary.train_path).expect("csv");
    assert!(header.starts_with(
        "MedInc,HouseAge,AveRooms,AveBedrms,Population,AveOccup,Latitude,Longitude,MedHouseVal\n"
    ));
}
