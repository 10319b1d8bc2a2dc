//! Integration tests for machine definitions and delivery normalisation

use mutools_delivery::{Delivery, Error, Machine};
use rstest::{fixture, rstest};

#[fixture]
fn sliding_window() -> Delivery {
    Delivery::from_vecs(
        vec![0.0, 0.0, 25.0, 25.0, 25.0, 25.0, 100.0],
        vec![
            vec![[6.0, -4.0], [6.0, -4.0]],
            vec![[6.0, -4.0], [6.0, -4.0]],
            vec![[3.0, -1.0], [3.0, -1.0]],
            vec![[2.0, 0.0], [2.0, 0.0]],
            vec![[1.0, 1.0], [1.0, 1.0]],
            vec![[0.0, 2.0], [0.0, 2.0]],
            vec![[-4.0, 6.0], [-4.0, 6.0]],
        ],
        vec![[5.0, 5.0]; 7],
    )
    .unwrap()
}

#[rstest]
fn machine_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("machine.json");

    let machine = Machine::millennium();
    machine.to_json(&path).unwrap();

    assert_eq!(Machine::from_json(&path).unwrap(), machine);
}

#[rstest]
#[case(r#"{ "leaf_pair_widths": [], "max_leaf_gap": 400.0 }"#)] // no leaves
#[case(r#"{ "leaf_pair_widths": [5.0, -5.0], "max_leaf_gap": 400.0 }"#)] // negative width
#[case(r#"{ "leaf_pair_widths": [5.0, 5.0], "max_leaf_gap": 0.0 }"#)] // no gap
fn invalid_machine_files(#[case] content: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("machine.json");
    std::fs::write(&path, content).unwrap();

    assert!(Machine::from_json(&path).is_err());
}

#[rstest]
fn missing_machine_file() {
    assert!(matches!(
        Machine::from_json("./does/not/exist.json"),
        Err(Error::IOError(_))
    ));
}

#[rstest]
fn plateau_positions_are_dropped(sliding_window: Delivery) {
    let normalised = sliding_window.remove_irrelevant_control_points();

    // control points 3 and 4 sit inside the 25 MU plateau
    assert_eq!(normalised.mu().to_vec(), vec![0.0, 0.0, 25.0, 25.0, 100.0]);
    assert_eq!(normalised.mlc()[[3, 0, 0]], 0.0);
    assert_eq!(normalised.jaw().dim(), (5, 2));
}

#[rstest]
fn normalising_twice_changes_nothing(sliding_window: Delivery) {
    let once = sliding_window.remove_irrelevant_control_points();
    let twice = once.remove_irrelevant_control_points();
    assert_eq!(once, twice);
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(5)]
fn split_preserves_total_mu(sliding_window: Delivery, #[case] control_point: usize) {
    let (first, second) = sliding_window.split_at(control_point).unwrap();
    assert_eq!(first.len() + second.len(), sliding_window.len() + 1);
    assert_eq!(
        first.total_mu() + second.total_mu(),
        sliding_window.total_mu()
    );
}
