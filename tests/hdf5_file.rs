use ndarray::{array, Array1};
use tempfile::TempDir;

use galacticus::fileformats::hdf5::{AttrValue, FileMode, Hdf5File, WriteOptions, WritePolicy};
use galacticus::GalacticusError;

fn scratch() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scratch.hdf5");
    (dir, path)
}

#[test]
fn groups_shallow_and_recursive() {
    let (_dir, path) = scratch();
    let f = Hdf5File::open(&path, FileMode::Create).unwrap();
    f.mk_group("Outputs/Output1/nodeData").unwrap();
    f.mk_group("Outputs/Output2/nodeData").unwrap();

    let mut shallow = f.ls_groups("Outputs", false).unwrap();
    shallow.sort();
    assert_eq!(shallow, vec!["Output1", "Output2"]);

    let mut deep = f.ls_groups("Outputs", true).unwrap();
    deep.sort();
    assert_eq!(
        deep,
        vec![
            "Outputs/Output1",
            "Outputs/Output1/nodeData",
            "Outputs/Output2",
            "Outputs/Output2/nodeData",
        ]
    );

    f.rm_group("Outputs/Output2").unwrap();
    assert!(!f.has_object("Outputs/Output2"));
    assert!(f.has_object("Outputs/Output1/nodeData"));
    // Removing an absent group is a no-op.
    f.rm_group("Outputs/Output2").unwrap();
}

#[test]
fn read_only_guard() {
    let (_dir, path) = scratch();
    {
        let f = Hdf5File::open(&path, FileMode::Create).unwrap();
        f.mk_group("nodeData").unwrap();
    }
    let f = Hdf5File::open(&path, FileMode::ReadOnly).unwrap();
    assert!(f.is_read_only());

    let err = f.mk_group("another").unwrap_err();
    match err.downcast_ref::<GalacticusError>() {
        Some(GalacticusError::ReadOnly { operation, .. }) => {
            assert_eq!(*operation, "mk_group");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let data = array![1.0_f64, 2.0];
    assert!(f
        .write_dataset("nodeData", "x", data.view().into_dyn(), &WriteOptions::default())
        .is_err());
    assert!(f.rm_dataset("nodeData", "x").is_err());
    assert!(f
        .write_attributes("nodeData", &[("a", AttrValue::Int(1))], false)
        .is_err());
    assert!(f.rm_attributes("nodeData", None).is_err());
}

#[test]
fn dataset_write_policies() {
    let (_dir, path) = scratch();
    let f = Hdf5File::open(&path, FileMode::Create).unwrap();

    let first: Array1<f64> = array![1.0, 2.0, 3.0];
    f.write_dataset("nodeData", "mass", first.view().into_dyn(), &WriteOptions::default())
        .unwrap();
    assert!(f.dataset_exists("nodeData", "mass"));
    assert_eq!(f.dataset_size("nodeData/mass").unwrap(), 3);

    // Create-if-absent leaves the existing dataset alone.
    let second: Array1<f64> = array![9.0];
    f.write_dataset("nodeData", "mass", second.view().into_dyn(), &WriteOptions::default())
        .unwrap();
    let back = f.read_dataset::<f64>("nodeData/mass").unwrap();
    assert_eq!(back.len(), 3);

    // Overwrite replaces it.
    f.write_dataset(
        "nodeData",
        "mass",
        second.view().into_dyn(),
        &WriteOptions::with_policy(WritePolicy::Overwrite),
    )
    .unwrap();
    let back = f.read_dataset::<f64>("nodeData/mass").unwrap();
    assert_eq!(back.into_raw_vec_and_offset().0, vec![9.0]);

    // Append resizes along axis 0.
    let tail: Array1<f64> = array![10.0, 11.0];
    f.write_dataset(
        "nodeData",
        "mass",
        tail.view().into_dyn(),
        &WriteOptions::with_policy(WritePolicy::Append),
    )
    .unwrap();
    let back = f.read_dataset::<f64>("nodeData/mass").unwrap();
    assert_eq!(back.into_raw_vec_and_offset().0, vec![9.0, 10.0, 11.0]);

    // Append also creates a missing dataset.
    let fresh: Array1<i64> = array![5, 6];
    f.append_dataset("nodeData", "index", fresh.view().into_dyn(), &WriteOptions::default())
        .unwrap();
    assert_eq!(f.dataset_size("nodeData/index").unwrap(), 2);

    f.rm_dataset("nodeData", "index").unwrap();
    assert!(!f.dataset_exists("nodeData", "index"));
}

#[test]
fn missing_dataset_is_key_not_found() {
    let (_dir, path) = scratch();
    let f = Hdf5File::open(&path, FileMode::Create).unwrap();
    f.mk_group("nodeData").unwrap();

    let err = f.read_dataset::<f64>("nodeData/absent").unwrap_err();
    match err.downcast_ref::<GalacticusError>() {
        Some(GalacticusError::KeyNotFound { missing, .. }) => {
            assert_eq!(missing, &vec!["absent".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn read_datasets_with_required_patterns() {
    let (_dir, path) = scratch();
    let f = Hdf5File::open(&path, FileMode::Create).unwrap();
    for name in ["diskMassStellar", "diskMassGaseous", "spheroidMassStellar"] {
        let data: Array1<f64> = array![1.0, 2.0];
        f.write_dataset("nodeData", name, data.view().into_dyn(), &WriteOptions::default())
            .unwrap();
    }

    let disks = f
        .read_datasets::<f64>("nodeData", Some(&["disk*"]), false, true)
        .unwrap();
    assert_eq!(disks.len(), 2);
    assert!(disks.contains_key("diskMassStellar"));

    // A pattern with no match is an error naming the missing key...
    let err = f
        .read_datasets::<f64>("nodeData", Some(&["disk*", "halo*"]), false, true)
        .unwrap_err();
    match err.downcast_ref::<GalacticusError>() {
        Some(GalacticusError::KeyNotFound { missing, .. }) => {
            assert_eq!(missing, &vec!["halo*".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // ...unless presence is not mandatory.
    let lenient = f
        .read_datasets::<f64>("nodeData", Some(&["disk*", "halo*"]), false, false)
        .unwrap();
    assert_eq!(lenient.len(), 2);
}

#[test]
fn recursive_dataset_listing_yields_leaf_paths() {
    let (_dir, path) = scratch();
    let f = Hdf5File::open(&path, FileMode::Create).unwrap();
    let data: Array1<f64> = array![0.5];
    f.write_dataset(
        "Outputs/Output1/nodeData",
        "mass",
        data.view().into_dyn(),
        &WriteOptions::default(),
    )
    .unwrap();
    f.write_dataset(
        "Outputs/Output2/nodeData",
        "mass",
        data.view().into_dyn(),
        &WriteOptions::default(),
    )
    .unwrap();

    let mut leaves = f.ls_datasets("Outputs", true).unwrap();
    leaves.sort();
    assert_eq!(
        leaves,
        vec![
            "Outputs/Output1/nodeData/mass",
            "Outputs/Output2/nodeData/mass",
        ]
    );

    let all = f.read_datasets::<f64>("Outputs", None, true, false).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn attributes_round_trip_and_strictness() {
    let (_dir, path) = scratch();
    let f = Hdf5File::open(&path, FileMode::Create).unwrap();
    f.mk_group("Version").unwrap();
    f.write_attributes(
        "Version",
        &[
            ("versionMajor", AttrValue::Int(0)),
            ("versionMinor", AttrValue::Int(9)),
            ("runTime", AttrValue::from("late")),
            ("timeSteps", AttrValue::FloatVec(vec![0.1, 0.2])),
        ],
        false,
    )
    .unwrap();

    let attrs = f.read_attributes("Version", None, false).unwrap();
    assert_eq!(attrs["versionMajor"], AttrValue::Int(0));
    assert_eq!(attrs["runTime"], AttrValue::Str("late".to_string()));
    assert_eq!(attrs["timeSteps"], AttrValue::FloatVec(vec![0.1, 0.2]));

    // Requested-but-absent keys are dropped quietly...
    let some = f
        .read_attributes("Version", Some(&["versionMajor", "nope"]), false)
        .unwrap();
    assert_eq!(some.len(), 1);

    // ...unless presence is mandatory.
    let err = f
        .read_attributes("Version", Some(&["versionMajor", "nope"]), true)
        .unwrap_err();
    match err.downcast_ref::<GalacticusError>() {
        Some(GalacticusError::KeyNotFound { missing, .. }) => {
            assert_eq!(missing, &vec!["nope".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Existing attributes are only replaced when overwriting.
    f.write_attributes("Version", &[("versionMinor", AttrValue::Int(10))], false)
        .unwrap();
    let attrs = f.read_attributes("Version", None, false).unwrap();
    assert_eq!(attrs["versionMinor"], AttrValue::Int(9));
    f.write_attributes("Version", &[("versionMinor", AttrValue::Int(10))], true)
        .unwrap();
    let attrs = f.read_attributes("Version", None, false).unwrap();
    assert_eq!(attrs["versionMinor"], AttrValue::Int(10));

    f.rm_attributes("Version", Some(&["runTime"])).unwrap();
    let attrs = f.read_attributes("Version", None, false).unwrap();
    assert!(!attrs.contains_key("runTime"));
    f.rm_attributes("Version", None).unwrap();
    let attrs = f.read_attributes("Version", None, false).unwrap();
    assert!(attrs.is_empty());
}

#[test]
fn copy_group_across_files_preserves_parent_path() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("src.hdf5");
    let dst_path = dir.path().join("dst.hdf5");

    let src = Hdf5File::open(&src_path, FileMode::Create).unwrap();
    let data: Array1<f64> = array![1.5, 2.5];
    src.write_dataset(
        "Outputs/Output1/nodeData",
        "mass",
        data.view().into_dyn(),
        &WriteOptions::default(),
    )
    .unwrap();
    src.write_attributes("Outputs/Output1", &[("outputExpansionFactor", AttrValue::Float(1.0))], false)
        .unwrap();

    let dst = Hdf5File::open(&dst_path, FileMode::Create).unwrap();
    dst.cp_group(&src, "Outputs/Output1", None).unwrap();

    assert!(dst.has_object("Outputs/Output1/nodeData/mass"));
    let back = dst.read_dataset::<f64>("Outputs/Output1/nodeData/mass").unwrap();
    assert_eq!(back.into_raw_vec_and_offset().0, vec![1.5, 2.5]);
    let attrs = dst.read_attributes("Outputs/Output1", None, false).unwrap();
    assert_eq!(attrs["outputExpansionFactor"], AttrValue::Float(1.0));
}
