//! Invariants that hold for any valid delivery

use mutools_delivery::{Delivery, Machine};
use mutools_mudensity::{FixedBatch, MuDensity, MuDensityCalculator, SystemMemory};
use rstest::{fixture, rstest};

const TOLERANCE: f64 = 1e-9;

fn toy_machine() -> Machine {
    Machine::new(vec![5.0, 5.0, 5.0, 5.0], 20.0).unwrap()
}

fn calculator() -> MuDensityCalculator {
    let mut calculator = MuDensityCalculator::new(toy_machine());
    calculator.set_memory_probe(FixedBatch);
    calculator
}

/// Leaves and jaws wandering smoothly over a dynamic delivery
#[fixture]
fn dynamic() -> Delivery {
    let n = 61;
    let mu = (0..n).map(|i| (i * i) as f64 / 40.0).collect();
    let mlc = (0..n)
        .map(|i| {
            let t = i as f64 / 10.0;
            (0..4)
                .map(|k| {
                    let phase = k as f64;
                    [4.0 * (t + phase).sin() + 2.0, 4.0 * (0.7 * t - phase).cos() + 3.0]
                })
                .collect()
        })
        .collect();
    let jaw = (0..n)
        .map(|i| {
            let t = i as f64 / 10.0;
            [6.0 + 3.0 * t.sin(), 6.0 + 3.0 * t.cos()]
        })
        .collect();

    Delivery::from_vecs(mu, mlc, jaw).unwrap()
}

fn assert_close(a: &MuDensity, b: &MuDensity) {
    assert!(a.grid.matches(&b.grid));
    for (u, v) in a.density.iter().zip(b.density.iter()) {
        assert!((u - v).abs() < TOLERANCE, "{u} != {v}");
    }
}

#[rstest]
fn bounded_by_total_mu(dynamic: Delivery) {
    let mu_density = calculator().calculate(&dynamic).unwrap();

    assert!(mu_density.density.iter().all(|v| *v >= 0.0));
    assert!(mu_density.max() <= dynamic.total_mu() + TOLERANCE);
    assert!(mu_density.max() > 0.0);

    // every MU reaches each cell of the leaf bank at most once
    let machine = toy_machine();
    let resolution = 1.0;
    let coverage = machine.total_leaf_width() * machine.max_leaf_gap();
    assert!(mu_density.total() * resolution * resolution <= dynamic.total_mu() * coverage);
}

#[rstest]
fn no_mu_no_density(dynamic: Delivery) {
    let stationary = Delivery::new(
        ndarray::Array1::from_elem(dynamic.len(), 25.0),
        dynamic.mlc().to_owned(),
        dynamic.jaw().to_owned(),
    )
    .unwrap();

    let mu_density = calculator().calculate(&stationary).unwrap();
    assert_eq!(mu_density.total(), 0.0);
}

#[rstest]
fn plateau_control_points_change_nothing() {
    let plain = Delivery::from_vecs(
        vec![0.0, 40.0, 40.0, 100.0],
        vec![
            vec![[6.0, -4.0]; 4],
            vec![[1.0, 1.0]; 4],
            vec![[3.0, 3.0]; 4],
            vec![[-4.0, 6.0]; 4],
        ],
        vec![[5.0, 5.0]; 4],
    )
    .unwrap();

    // a beam-off motion through an arbitrary shape inside the plateau
    let inserted = Delivery::from_vecs(
        vec![0.0, 40.0, 40.0, 40.0, 100.0],
        vec![
            vec![[6.0, -4.0]; 4],
            vec![[1.0, 1.0]; 4],
            vec![[9.0, 9.0]; 4],
            vec![[3.0, 3.0]; 4],
            vec![[-4.0, 6.0]; 4],
        ],
        vec![[5.0, 5.0], [5.0, 5.0], [1.0, 8.0], [5.0, 5.0], [5.0, 5.0]],
    )
    .unwrap();

    let mut calculator = calculator();
    assert_eq!(
        calculator.calculate(&plain).unwrap(),
        calculator.calculate(&inserted).unwrap()
    );
}

#[rstest]
#[case(2, 0)]
#[case(-3, 0)]
#[case(0, 2)]
#[case(2, -3)]
#[case(-3, 4)]
fn translation_moves_density(#[case] dx: i32, #[case] dy: i32) {
    // every leaf pair is identical, so moving the jaws moves the rows
    let window = |dx: f64, dy: f64| {
        Delivery::from_vecs(
            vec![0.0, 60.0, 100.0],
            vec![
                vec![[4.0 - dx, -2.0 + dx]; 4],
                vec![[1.5 - dx, 0.5 + dx]; 4],
                vec![[-2.0 - dx, 4.0 + dx]; 4],
            ],
            vec![
                [4.0 - dy, 5.0 + dy],
                [3.0 - dy, 6.0 + dy],
                [4.0 - dy, 5.0 + dy],
            ],
        )
        .unwrap()
    };

    let mut calculator = calculator();
    let original = calculator.calculate(&window(0.0, 0.0)).unwrap();
    let shifted = calculator
        .calculate(&window(f64::from(dx), f64::from(dy)))
        .unwrap();

    let (rows, columns) = original.grid.shape();
    let (rows, columns) = (rows as i32, columns as i32);
    for j in 0..rows {
        for i in 0..columns {
            let (sj, si) = (j + dy, i + dx);
            if (0..rows).contains(&sj) && (0..columns).contains(&si) {
                let a = original.density[[j as usize, i as usize]];
                let b = shifted.density[[sj as usize, si as usize]];
                assert!((a - b).abs() < TOLERANCE, "{a} != {b} at ({j}, {i})");
            }
        }
    }
    assert!(original.total() > 0.0);
    assert!((original.total() - shifted.total()).abs() < TOLERANCE);
}

#[rstest]
#[case(1)]
#[case(17)]
#[case(30)]
#[case(59)]
fn split_deliveries_sum_to_whole(dynamic: Delivery, #[case] control_point: usize) {
    let (first, second) = dynamic.split_at(control_point).unwrap();

    let mut calculator = calculator();
    let whole = calculator.calculate(&dynamic).unwrap();
    let mut parts = calculator.calculate(&first).unwrap();
    parts.accumulate(&calculator.calculate(&second).unwrap()).unwrap();

    assert_close(&whole, &parts);
    assert!(whole.comparison(&parts, None).unwrap() < TOLERANCE);
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(20)]
#[case(100)]
fn batch_size_does_not_matter(dynamic: Delivery, #[case] min_batch_size: usize) {
    let reference = calculator().calculate(&dynamic).unwrap();

    let mut batched = calculator();
    batched.set_min_batch_size(min_batch_size);
    assert_close(&reference, &batched.calculate(&dynamic).unwrap());
}

#[rstest]
#[case(0.05)]
#[case(0.8)]
#[case(1.0)]
fn ram_fraction_does_not_matter(dynamic: Delivery, #[case] ram_fraction: f64) {
    let reference = calculator().calculate(&dynamic).unwrap();

    let mut adaptive = MuDensityCalculator::new(toy_machine());
    adaptive.set_memory_probe(SystemMemory::new());
    adaptive.set_min_batch_size(2);
    adaptive.set_ram_fraction(ram_fraction);
    assert_close(&reference, &adaptive.calculate(&dynamic).unwrap());
}

#[rstest]
fn csv_export(dynamic: Delivery) {
    let mu_density = calculator().calculate(&dynamic).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("density.csv");
    mu_density.write_csv(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    // header row plus one row per y
    assert_eq!(lines.len(), 21);
    assert!(lines[0].starts_with("y\\x,-10,-9,"));
    assert!(lines[1].starts_with("-9.5,"));
    assert_eq!(lines[1].split(',').count(), 22);
}
