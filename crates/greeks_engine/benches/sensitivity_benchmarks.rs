//! Criterion benchmarks for greeks_engine sensitivity runs.
//!
//! Benchmarks cover:
//! - ByTenor bump-and-reprice over growing portfolios
//! - Bump strategies (Uniform, Parallel, ByTenor) on one portfolio
//! - Finite difference vs semi-analytic sensitivities
//! - Sequential vs Rayon batch evaluation
//! - Compound scenario runs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use greeks_core::market_data::curves::calibrators::{SpreadCalibrator, ZeroRateCalibrator};
use greeks_core::market_data::curves::{Curve, CurveHandle, CurveKind, CurveTenor};
use greeks_core::traits::{BumpTarget, MarketDependencies, Measure, OrdinateDerivatives, Pricer};
use greeks_core::types::PricingError;
use greeks_engine::config::{BumpType, SensitivityConfig, SensitivityMethod};
use greeks_engine::evaluator::PricerEvaluator;
use greeks_engine::parallel::ParallelConfig;
use greeks_engine::scenarios::{CurveQuoteShift, Scenario, ScenarioComposer};
use greeks_engine::sensitivity::SensitivityCalculator;
use std::sync::Arc;

/// Annual-pay annuity discounted on one curve.
#[derive(Debug)]
struct Annuity {
    name: String,
    curve: CurveHandle,
    years: u32,
}

impl Pricer for Annuity {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, measure: &Measure) -> bool {
        *measure == Measure::Pv
    }

    fn evaluate(&self, _measure: &Measure) -> Result<f64, PricingError> {
        let curve = self.curve.read();
        let mut pv = 0.0;
        for year in 1..=self.years {
            let t = f64::from(year);
            pv += (-curve.value(t)? * t).exp();
        }
        Ok(pv)
    }

    fn market_dependencies(&self) -> MarketDependencies {
        MarketDependencies::new().with(&self.curve)
    }

    fn supports_ordinate_derivatives(&self, measure: &Measure) -> bool {
        self.supports(measure)
    }

    fn ordinate_derivatives(
        &self,
        _measure: &Measure,
        curve: &CurveHandle,
    ) -> Result<OrdinateDerivatives, PricingError> {
        let guard = curve.read();
        let mut gradient = vec![0.0; guard.ordinates().len()];
        if *curve == self.curve {
            // Ordinates sit on whole years, so each cash flow loads one ordinate.
            for (k, ordinate) in guard.ordinates().iter().enumerate() {
                let t = ordinate.time;
                if t <= f64::from(self.years) && t.fract() == 0.0 {
                    gradient[k] = -t * (-ordinate.value * t).exp();
                }
            }
        }
        Ok(OrdinateDerivatives {
            gradient,
            curvature: None,
        })
    }
}

/// OIS curve on whole-year tenors plus a basis curve over it.
fn create_benchmark_market(n_tenors: u32) -> (CurveHandle, CurveHandle) {
    let tenors = (1..=n_tenors)
        .map(|y| CurveTenor::rate(format!("{}Y", y), f64::from(y), 0.03 + 0.0005 * f64::from(y)))
        .collect();
    let ois = CurveHandle::new(
        Curve::new("USD-OIS", CurveKind::Discount, tenors)
            .unwrap()
            .with_calibrator(Arc::new(ZeroRateCalibrator))
            .fitted()
            .unwrap(),
    );
    let spreads = (1..=n_tenors)
        .step_by(2)
        .map(|y| CurveTenor::spread(format!("{}Y", y), f64::from(y), 0.001))
        .collect();
    let basis = CurveHandle::new(
        Curve::new("USD-3M", CurveKind::Basis, spreads)
            .unwrap()
            .with_calibrator(Arc::new(SpreadCalibrator))
            .with_prerequisite(ois.clone())
            .fitted()
            .unwrap(),
    );
    (ois, basis)
}

fn create_benchmark_pricers(n_trades: usize, ois: &CurveHandle, basis: &CurveHandle, max_years: u32) -> Vec<Arc<dyn Pricer>> {
    (0..n_trades)
        .map(|i| {
            let curve = if i % 3 == 0 { basis } else { ois };
            Arc::new(Annuity {
                name: format!("trade-{}", i),
                curve: curve.clone(),
                years: 1 + (i as u32 % max_years),
            }) as Arc<dyn Pricer>
        })
        .collect()
}

/// Benchmark ByTenor deltas over growing portfolios.
fn bench_by_tenor_portfolio(c: &mut Criterion) {
    let mut group = c.benchmark_group("by_tenor_portfolio");
    group.sample_size(20);

    let (ois, basis) = create_benchmark_market(10);
    for n_trades in [10, 100, 500] {
        let pricers = create_benchmark_pricers(n_trades, &ois, &basis, 10);
        let measures = vec![Measure::Pv; n_trades];
        let calculator = SensitivityCalculator::new(
            SensitivityConfig::new().with_targets(BumpTarget::INTEREST_RATES | BumpTarget::INTEREST_RATE_BASIS),
        );

        group.bench_with_input(BenchmarkId::new("trades", n_trades), &pricers, |b, pricers| {
            b.iter(|| calculator.compute(black_box(pricers), black_box(&measures)));
        });
    }

    group.finish();
}

/// Benchmark the three bump strategies on the same portfolio.
fn bench_bump_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("bump_types");

    let (ois, basis) = create_benchmark_market(20);
    let pricers = create_benchmark_pricers(50, &ois, &basis, 20);
    let measures = vec![Measure::Pv; pricers.len()];

    for bump_type in [BumpType::Uniform, BumpType::Parallel, BumpType::ByTenor] {
        let calculator = SensitivityCalculator::new(
            SensitivityConfig::new().with_bump_type(bump_type).with_gamma(true),
        );
        group.bench_function(BenchmarkId::new("strategy", bump_type), |b| {
            b.iter(|| calculator.compute(black_box(&pricers), black_box(&measures)));
        });
    }

    group.finish();
}

/// Benchmark finite difference against semi-analytic deltas.
fn bench_fd_vs_semi_analytic(c: &mut Criterion) {
    let mut group = c.benchmark_group("fd_vs_semi_analytic");

    let (ois, _basis) = create_benchmark_market(30);
    let pricers = create_benchmark_pricers(100, &ois, &ois, 30);
    let measures = vec![Measure::Pv; pricers.len()];

    for method in [SensitivityMethod::FiniteDifference, SensitivityMethod::SemiAnalytic] {
        let calculator = SensitivityCalculator::new(SensitivityConfig::new().with_method(method));
        group.bench_function(BenchmarkId::new("method", format!("{:?}", method)), |b| {
            b.iter(|| calculator.compute(black_box(&pricers), black_box(&measures)));
        });
    }

    group.finish();
}

/// Benchmark sequential against Rayon batch evaluation.
fn bench_parallel_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_evaluation");
    group.sample_size(10);

    let (ois, basis) = create_benchmark_market(10);
    let pricers = create_benchmark_pricers(1000, &ois, &basis, 10);
    let measures = vec![Measure::Pv; pricers.len()];

    for (label, parallel) in [
        ("sequential", ParallelConfig::sequential()),
        ("rayon_64", ParallelConfig::new(64, 100)),
        ("rayon_256", ParallelConfig::new(256, 100)),
    ] {
        let calculator = SensitivityCalculator::new(SensitivityConfig::new().with_parallel(parallel));
        group.bench_function(label, |b| {
            b.iter(|| calculator.compute(black_box(&pricers), black_box(&measures)));
        });
    }

    group.finish();
}

/// Benchmark a compound scenario run.
fn bench_scenario(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario");

    let (ois, basis) = create_benchmark_market(10);
    let evaluators: Vec<PricerEvaluator> = create_benchmark_pricers(200, &ois, &basis, 10)
        .into_iter()
        .filter_map(|p| PricerEvaluator::new(p, Measure::Pv).ok())
        .collect();
    let composer = ScenarioComposer::default();

    group.bench_function("steepener", |b| {
        b.iter(|| {
            let mut scenario = Scenario::new("steepener")
                .with_shift(CurveQuoteShift::rates("short", -0.001).on_tenors(["1Y", "2Y"]))
                .with_shift(CurveQuoteShift::rates("long", 0.001).on_tenors(["9Y", "10Y"]));
            composer.run(black_box(&mut scenario), black_box(&evaluators))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_by_tenor_portfolio,
    bench_bump_types,
    bench_fd_vs_semi_analytic,
    bench_parallel_evaluation,
    bench_scenario,
);
criterion_main!(benches);
