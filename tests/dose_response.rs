use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use assayfit::prelude::models::{grid_search_initialize, refine};
use assayfit::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn example_curve() -> Curve {
    Curve::new(
        "example",
        vec![1.0, 3.0, 10.0, 30.0, 100.0],
        vec![5.0, 20.0, 50.0, 80.0, 95.0],
        None,
    )
    .unwrap()
}

fn exact_curve(id: &str, params: &FourParameters, doses: &[f64]) -> Curve {
    let mut rng = StdRng::seed_from_u64(0);
    data::simulate::logistic_curve(id, params, doses, 0.0, &mut rng).unwrap()
}

#[test]
fn both_models_agree_on_example_data() {
    let curve = example_curve();
    let seeds = Seeds::from_log_dose(1.0).unwrap();

    let mut polynomial = PolynomialFit::fit(&curve, 3).unwrap();
    polynomial.solve_inflection(seeds.log_dose(), 1e-6).unwrap();
    let polynomial_ed50 = polynomial.ed50().unwrap();
    assert!((9.0..11.0).contains(&polynomial_ed50), "ED50 = {}", polynomial_ed50);

    let seed = seeds.seed_four_parameter(FourParameterFit::new()).unwrap();
    let logistic = FitOrchestrator::new()
        .fit(&curve, &seed, &FitMonitor::new())
        .unwrap();
    assert_eq!(logistic.quality(), FitQuality::LeastSquaresConverged);
    let logistic_ed50 = logistic.ed50().unwrap();
    assert!((logistic_ed50 - 10.0).abs() < 1.0, "ED50 = {}", logistic_ed50);
    assert!(logistic.b().unwrap() > 0.0);

    let summary = FitSummary::new(&curve, Some(&polynomial), Some(&logistic)).unwrap();
    assert!(summary.four_parameter().unwrap().r_squared.unwrap() > 0.99);

    let records = FitRecord::collect(curve.id(), Some(&polynomial), Some(&logistic));
    assert_eq!(records.len(), 2);
}

#[test]
fn exact_data_recovers_generating_parameters() {
    let cases = [
        (
            FourParameters::new(2.0, 1.5, 20.0, 98.0),
            (0..8).map(|i| 2f64.powi(i)).collect::<Vec<_>>(),
            20.0,
        ),
        (
            FourParameters::new(2.0, 1.5, 20.0, 98.0),
            (0..8).map(|i| 2f64.powi(i)).collect::<Vec<_>>(),
            15.0,
        ),
        (
            FourParameters::new(10.0, 0.8, 5.0, 60.0),
            data::simulate::dilution_series(0.1, 3.0, 9).unwrap(),
            4.0,
        ),
    ];

    for (truth, doses, seed) in cases {
        let curve = exact_curve("synthetic", &truth, &doses);
        let config = SearchConfig::DEFAULT;
        let grid =
            grid_search_initialize(&curve, Some(seed), None, None, &config, &FitMonitor::new())
                .unwrap();

        // within one ED50 grid step of the generating value
        let x_window = config.x_search_fraction * (curve.x_max() - curve.x_min());
        let ed50_step = x_window / config.ed_iterations as f64;
        let grid_ed50 = grid.c().unwrap();
        assert!(
            (grid_ed50 - truth.c).abs() <= ed50_step,
            "seed {}: grid ED50 {} vs {}",
            seed,
            grid_ed50,
            truth.c
        );

        let refined = refine(&grid, &curve);
        assert_eq!(refined.quality(), FitQuality::LeastSquaresConverged);
        let params = refined.parameters().unwrap();
        assert_abs_diff_eq!(params.a, truth.a, epsilon = 1e-6);
        assert_abs_diff_eq!(params.b, truth.b, epsilon = 1e-6);
        assert_abs_diff_eq!(params.c, truth.c, epsilon = 1e-6);
        assert_abs_diff_eq!(params.d, truth.d, epsilon = 1e-6);
    }
}

#[test]
fn descending_input_is_normalized() {
    let curve = Curve::builder("descending")
        .point_with_error(100.0, 95.0, 1.0)
        .point_with_error(10.0, 50.0, 2.0)
        .point_with_error(1.0, -3.0, 3.0)
        .build()
        .unwrap();
    assert_eq!(curve.x(), &[1.0, 10.0, 100.0]);
    assert_eq!(curve.y(), &[0.0, 50.0, 95.0]);
    assert_eq!(curve.stderr(), &[3.0, 2.0, 1.0]);
    assert_eq!(curve.clamped(), 1);
}

#[test]
fn rejected_batch_keeps_every_field() {
    let orchestrator = FitOrchestrator::new();
    orchestrator.set_config([("ed_iterations", "8")]).unwrap();
    let before = orchestrator.get_config();

    let result = orchestrator.set_config([
        ("y_search_fraction", "0.3"),
        ("x_search_fraction", "0.3"),
        ("y_iterations", "6"),
        ("slope_iterations", "6"),
        ("max_slope", "4"),
        ("initial_slope_iterations", "-5"),
    ]);
    assert!(result.is_err());
    assert_eq!(orchestrator.get_config(), before);
    assert_eq!(orchestrator.get_config().ed_iterations, 8);
}

#[test]
fn cancelled_refit_leaves_previous_fit_untouched() {
    let curve = example_curve();
    let orchestrator = FitOrchestrator::new();
    let seed = FourParameterFit::new().with_ed50_seed(10.0).unwrap();
    let previous = orchestrator.fit(&curve, &seed, &FitMonitor::new()).unwrap();
    let snapshot = previous.clone();

    let monitor = FitMonitor::new();
    let trigger = monitor.clone();
    let monitor = monitor.on_progress(move |percent| {
        if percent >= 50 {
            trigger.cancel();
        }
    });
    let result = orchestrator.fit(&curve, &previous, &monitor);
    assert!(matches!(result, Err(AssayError::Cancelled { stage: "grid search", .. })));
    assert_eq!(previous, snapshot);
    assert!(!orchestrator.is_fitting(curve.id()));
}

#[test]
fn assay_fits_run_per_curve() {
    let truth = FourParameters::new(2.0, 1.5, 20.0, 98.0);
    let doses: Vec<f64> = (0..8).map(|i| 2f64.powi(i)).collect();
    let curves = (0..4)
        .map(|i| exact_curve(&format!("mol-{}", i), &truth, &doses))
        .collect();
    let assay = Assay::from_curves("plate-1", curves).unwrap();
    let seeds: HashMap<String, FourParameterFit> = assay
        .ids()
        .into_iter()
        .map(|id| (id.to_string(), FourParameterFit::new().with_ed50_seed(20.0).unwrap()))
        .collect();

    let results = FitOrchestrator::new().fit_assay(&assay, &seeds, &CancellationToken::new());
    assert_eq!(results.len(), 4);
    for (id, result) in results {
        let fit = result.unwrap();
        assert!(id.starts_with("mol-"));
        assert_abs_diff_eq!(fit.ed50().unwrap(), 20.0, epsilon = 1e-6);
    }
}

#[test]
fn cancelled_assay_reports_every_curve() {
    let assay = Assay::from_curves("plate-2", vec![example_curve()]).unwrap();
    let seeds = HashMap::from([(
        "example".to_string(),
        FourParameterFit::new().with_ed50_seed(10.0).unwrap(),
    )]);
    let token = CancellationToken::new();
    token.cancel();
    let results = FitOrchestrator::new().fit_assay(&assay, &seeds, &token);
    assert!(matches!(results[0].1, Err(AssayError::Cancelled { .. })));
}
