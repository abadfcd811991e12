use crate::error::AnalysisError;
use crate::model::{
    BoxStats, Comparison, ConfidenceInterval, PairComparison, PairOutcome, ScalingEfficiency,
    SignificanceTest, StandardStats,
};
use anyhow::Context;
use bench_summary_model::Direction;
use itertools::Itertools;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Confidence level used for the reported intervals
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Fewest samples per side for a pairwise significance test
pub const MIN_SIGNIFICANCE_SAMPLES: usize = 3;

/// Largest smaller-sample size for which the exact U distribution is used
const EXACT_U_MAX_SAMPLES: usize = 8;

pub fn standard_stats(values: &[f64]) -> anyhow::Result<StandardStats> {
    if values.is_empty() {
        return Err(AnalysisError::NoSamples.into());
    }

    let value_series = Series::new("value".into(), values);

    let mean = value_series.mean().context("Mean")?;
    let median = value_series.median().context("Median")?;
    let std = if values.len() < 2 {
        0.0
    } else {
        value_series.std(1).context("Std")?
    };
    let min = value_series
        .min::<f64>()
        .context("Min")?
        .context("Missing min")?;
    let max = value_series
        .max::<f64>()
        .context("Max")?
        .context("Missing max")?;

    let sorted = sorted(values);

    Ok(StandardStats {
        count: values.len(),
        mean,
        median,
        std,
        min,
        max,
        p95: percentile(&sorted, 95.0),
        p99: percentile(&sorted, 99.0),
        confidence_interval: confidence_interval(values, DEFAULT_CONFIDENCE)?,
    })
}

pub fn mean(values: &[f64]) -> anyhow::Result<f64> {
    if values.is_empty() {
        return Err(AnalysisError::NoSamples.into());
    }

    Series::new("value".into(), values).mean().context("Mean")
}

/// The `p`th percentile of ascending `sorted` samples, picked by index without interpolation.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let index = ((sorted.len() as f64 * p / 100.0).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    values.iter().copied().sorted_by(f64::total_cmp).collect()
}

/// Quartiles with linear interpolation, whiskers at the furthest samples within 1.5 IQR.
pub fn box_stats(values: &[f64]) -> anyhow::Result<BoxStats> {
    if values.is_empty() {
        return Err(AnalysisError::NoSamples.into());
    }

    let sorted = sorted(values);
    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let lower_whisker = sorted
        .iter()
        .copied()
        .find(|v| *v >= low_fence)
        .unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= high_fence)
        .unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();

    Ok(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        mean: mean(values)?,
        outliers,
    })
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Two-sided t-distribution confidence interval of the mean, [None] with fewer than two samples.
pub fn confidence_interval(
    values: &[f64],
    level: f64,
) -> anyhow::Result<Option<ConfidenceInterval>> {
    if values.len() < 2 {
        return Ok(None);
    }

    let stats_mean = mean(values)?;
    let std = Series::new("value".into(), values).std(1).context("Std")?;
    let sem = std / (values.len() as f64).sqrt();

    let Some(t) = significance::t_critical(level, values.len() - 1)? else {
        return Ok(None);
    };

    Ok(Some(ConfidenceInterval {
        level,
        lower: stats_mean - sem * t,
        upper: stats_mean + sem * t,
    }))
}

/// Two-sided Mann-Whitney U test, returning the U statistic of `first` and the p-value.
///
/// The p-value comes from the exact U distribution when the smaller sample has at most
/// eight values and there are no ties, otherwise from the normal approximation
/// with tie and continuity correction.
///
/// [None] when significance testing is not available in this build.
pub fn mann_whitney_u(first: &[f64], second: &[f64]) -> anyhow::Result<Option<(f64, f64)>> {
    if first.is_empty() || second.is_empty() {
        return Err(AnalysisError::NoSamples.into());
    }
    if !significance::available() {
        return Ok(None);
    }

    let n1 = first.len() as f64;
    let n2 = second.len() as f64;
    let n = n1 + n2;

    let combined = first
        .iter()
        .map(|v| (*v, true))
        .chain(second.iter().map(|v| (*v, false)))
        .sorted_by(|a, b| a.0.total_cmp(&b.0))
        .collect::<Vec<_>>();

    // Average ranks over ties
    let mut first_rank_sum = 0.0;
    let mut tie_term = 0.0;
    let mut start = 0;
    while start < combined.len() {
        let mut end = start;
        while end + 1 < combined.len() && combined[end + 1].0 == combined[start].0 {
            end += 1;
        }
        let tied = (end - start + 1) as f64;
        let rank = (start + end) as f64 / 2.0 + 1.0;
        first_rank_sum += rank * combined[start..=end].iter().filter(|(_, a)| *a).count() as f64;
        tie_term += tied.powi(3) - tied;
        start = end + 1;
    }

    let u1 = first_rank_sum - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let u = u1.max(u2);

    if tie_term == 0.0 && first.len().min(second.len()) <= EXACT_U_MAX_SAMPLES {
        // P(U >= max(U1, U2)) equals P(U <= min(U1, U2)) by symmetry
        let lower_tail = exact_u_cdf(u1.min(u2).round() as usize, first.len(), second.len());
        return Ok(Some((u1, (2.0 * lower_tail).min(1.0))));
    }

    let mu = n1 * n2 / 2.0;
    let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
    if sigma == 0.0 || !sigma.is_finite() {
        return Ok(Some((u1, 1.0)));
    }

    let z = (u - mu - 0.5) / sigma;
    let Some(upper_tail) = significance::normal_sf(z)? else {
        return Ok(None);
    };

    Ok(Some((u1, (2.0 * upper_tail).clamp(0.0, 1.0))))
}

/// P(U <= u) under the null hypothesis for samples of `n1` and `n2` values without ties.
///
/// The number of orderings giving each U is a coefficient of the Gaussian binomial
/// `[n1 + n2, n1]`, built one factor at a time and truncated at degree `u`.
fn exact_u_cdf(u: usize, n1: usize, n2: usize) -> f64 {
    let (small, large) = (n1.min(n2), n1.max(n2));

    let mut counts = vec![0.0_f64; u + 1];
    counts[0] = 1.0;
    for j in 1..=small {
        // Multiply by (1 - q^(large + j))
        let shift = large + j;
        for k in (shift..=u).rev() {
            counts[k] -= counts[k - shift];
        }
        // Divide by (1 - q^j)
        for k in j..=u {
            counts[k] += counts[k - j];
        }
    }

    let orderings = (1..=small).fold(1.0, |acc, i| acc * (large + i) as f64 / i as f64);
    counts.iter().sum::<f64>() / orderings
}

pub fn significance_marker(p_value: f64) -> &'static str {
    if p_value < 0.001 {
        "***"
    } else if p_value < 0.01 {
        "**"
    } else if p_value < 0.05 {
        "*"
    } else {
        "ns"
    }
}

/// Test every pair of runtimes, in the order given, for a significant difference.
///
/// Pairs where either side has fewer than [MIN_SIGNIFICANCE_SAMPLES] samples are skipped. Returns
/// nothing when significance testing is not available in this build.
pub fn pairwise_significance(samples: &[(&str, &[f64])]) -> anyhow::Result<Vec<PairComparison>> {
    let mut comparisons = Vec::new();

    for ((first, first_values), (second, second_values)) in samples.iter().tuple_combinations() {
        if first_values.len() < MIN_SIGNIFICANCE_SAMPLES
            || second_values.len() < MIN_SIGNIFICANCE_SAMPLES
        {
            comparisons.push(PairComparison {
                first: first.to_string(),
                second: second.to_string(),
                outcome: PairOutcome::Skipped {
                    reason: format!(
                        "insufficient samples ({} vs {})",
                        first_values.len(),
                        second_values.len()
                    ),
                },
            });
            continue;
        }

        let Some((u_statistic, p_value)) = mann_whitney_u(first_values, second_values)? else {
            return Ok(Vec::new());
        };

        let first_mean = mean(first_values)?;
        let second_mean = mean(second_values)?;

        comparisons.push(PairComparison {
            first: first.to_string(),
            second: second.to_string(),
            outcome: PairOutcome::Tested(SignificanceTest {
                first_mean,
                second_mean,
                diff_pct: (second_mean - first_mean) / first_mean * 100.0,
                u_statistic,
                p_value,
                marker: significance_marker(p_value).to_string(),
            }),
        });
    }

    Ok(comparisons)
}

/// Scaling efficiency of mean throughput per concurrency level, relative to concurrency 1.
///
/// Empty when there is no concurrency 1 baseline.
pub fn scaling_efficiency(means: &BTreeMap<u32, f64>) -> Vec<ScalingEfficiency> {
    let Some(baseline) = means.get(&1).copied() else {
        return Vec::new();
    };

    means
        .iter()
        .map(|(concurrency, mean)| {
            let actual_speedup = mean / baseline;
            let ideal_speedup = *concurrency as f64;
            ScalingEfficiency {
                concurrency: *concurrency,
                actual_speedup,
                ideal_speedup,
                efficiency_pct: actual_speedup / ideal_speedup * 100.0,
            }
        })
        .collect()
}

/// Pick the better of two means.
pub fn compare_means(first: (&str, f64), second: (&str, f64), direction: Direction) -> Comparison {
    let second_wins = match direction {
        Direction::LowerIsBetter => first.1 > second.1,
        Direction::HigherIsBetter => first.1 < second.1,
    };

    let (winner, loser) = if second_wins {
        (second, first)
    } else {
        (first, second)
    };

    let ratio = match direction {
        Direction::LowerIsBetter => loser.1 / winner.1,
        Direction::HigherIsBetter => winner.1 / loser.1,
    };

    Comparison {
        winner: winner.0.to_string(),
        loser: loser.0.to_string(),
        ratio,
    }
}

/// How many times better `value` is than `baseline`, above 1 when `value` is better.
pub fn speedup(baseline: f64, value: f64, direction: Direction) -> f64 {
    match direction {
        Direction::LowerIsBetter => baseline / value,
        Direction::HigherIsBetter => value / baseline,
    }
}

/// Percentage by which `value` exceeds `base`, 0 when `base` is 0.
pub fn overhead_pct(base: f64, value: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        (value - base) / base * 100.0
    }
}

#[cfg(feature = "significance")]
mod significance {
    use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

    pub(super) fn available() -> bool {
        true
    }

    pub(super) fn t_critical(level: f64, freedom: usize) -> anyhow::Result<Option<f64>> {
        let dist = StudentsT::new(0.0, 1.0, freedom as f64)
            .map_err(|e| anyhow::anyhow!("Student's t distribution: {e}"))?;
        Ok(Some(dist.inverse_cdf((1.0 + level) / 2.0)))
    }

    pub(super) fn normal_sf(z: f64) -> anyhow::Result<Option<f64>> {
        let dist =
            Normal::new(0.0, 1.0).map_err(|e| anyhow::anyhow!("Normal distribution: {e}"))?;
        Ok(Some(dist.sf(z)))
    }
}

#[cfg(not(feature = "significance"))]
mod significance {
    use std::sync::Once;

    static WARN_ONCE: Once = Once::new();

    fn warn_unavailable() {
        WARN_ONCE.call_once(|| {
            log::warn!(
                "Built without the `significance` feature, confidence intervals and significance tests are skipped"
            )
        });
    }

    pub(super) fn available() -> bool {
        warn_unavailable();
        false
    }

    pub(super) fn t_critical(_level: f64, _freedom: usize) -> anyhow::Result<Option<f64>> {
        warn_unavailable();
        Ok(None)
    }

    pub(super) fn normal_sf(_z: f64) -> anyhow::Result<Option<f64>> {
        warn_unavailable();
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{actual} is not within {tolerance} of {expected}"
        );
    }

    #[test]
    fn stats_of_three_samples() -> anyhow::Result<()> {
        let stats = standard_stats(&[10.0, 20.0, 30.0])?;

        assert_eq!(stats.count, 3);
        assert_close(stats.mean, 20.0, 1e-9);
        assert_close(stats.median, 20.0, 1e-9);
        assert_close(stats.std, 10.0, 1e-9);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 30.0);
        assert_eq!(stats.p95, 30.0);
        Ok(())
    }

    #[test]
    fn std_uses_sample_denominator() -> anyhow::Result<()> {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let expected = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64)
            .sqrt();

        let stats = standard_stats(&values)?;

        assert_close(stats.std, expected, 1e-9);
        assert_close(stats.median, 4.5, 1e-9);
        Ok(())
    }

    #[test]
    fn single_sample_has_zero_std_and_no_interval() -> anyhow::Result<()> {
        let stats = standard_stats(&[42.0])?;

        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.confidence_interval, None);
        assert_eq!(stats.p99, 42.0);
        Ok(())
    }

    #[test]
    fn no_samples_is_an_error() {
        let err = standard_stats(&[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::NoSamples)
        ));
    }

    #[test]
    fn percentile_picks_by_floor_index() {
        let sorted = (1..=10).map(f64::from).collect::<Vec<_>>();

        assert_eq!(percentile(&sorted, 50.0), 6.0);
        assert_eq!(percentile(&sorted, 95.0), 10.0);
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&[], 95.0), 0.0);
    }

    #[test]
    fn box_stats_flag_outliers() -> anyhow::Result<()> {
        let stats = box_stats(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0])?;

        assert_close(stats.q1, 2.25, 1e-9);
        assert_close(stats.median, 3.5, 1e-9);
        assert_close(stats.q3, 4.75, 1e-9);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.outliers, vec![100.0]);
        Ok(())
    }

    #[test]
    fn efficiency_is_relative_to_concurrency_one() {
        let means = BTreeMap::from([(1, 100.0), (2, 180.0), (4, 300.0)]);
        let efficiency = scaling_efficiency(&means);

        assert_eq!(efficiency.len(), 3);
        assert_eq!(efficiency[0].efficiency_pct, 100.0);
        assert_close(efficiency[1].efficiency_pct, 90.0, 1e-9);
        assert_close(efficiency[2].actual_speedup, 3.0, 1e-9);
        assert_close(efficiency[2].efficiency_pct, 75.0, 1e-9);
    }

    #[test]
    fn efficiency_needs_a_baseline() {
        let means = BTreeMap::from([(2, 180.0), (4, 300.0)]);
        assert!(scaling_efficiency(&means).is_empty());
    }

    #[test]
    fn comparison_follows_direction() {
        let lower = compare_means(
            ("docker", 300.0),
            ("wasmtime", 100.0),
            Direction::LowerIsBetter,
        );
        assert_eq!(lower.winner, "wasmtime");
        assert_eq!(lower.loser, "docker");
        assert_close(lower.ratio, 3.0, 1e-9);

        let higher = compare_means(
            ("docker", 300.0),
            ("wasmtime", 100.0),
            Direction::HigherIsBetter,
        );
        assert_eq!(higher.winner, "docker");
        assert_close(higher.ratio, 3.0, 1e-9);
    }

    #[test]
    fn speedup_follows_direction() {
        assert_close(speedup(200.0, 100.0, Direction::LowerIsBetter), 2.0, 1e-9);
        assert_close(speedup(200.0, 100.0, Direction::HigherIsBetter), 0.5, 1e-9);
    }

    #[test]
    fn overhead_of_zero_base() {
        assert_eq!(overhead_pct(0.0, 5.0), 0.0);
        assert_close(overhead_pct(2.0, 3.0), 50.0, 1e-9);
    }

    #[test]
    fn markers() {
        assert_eq!(significance_marker(0.0005), "***");
        assert_eq!(significance_marker(0.005), "**");
        assert_eq!(significance_marker(0.03), "*");
        assert_eq!(significance_marker(0.05), "ns");
    }

    #[test]
    fn small_pairs_are_skipped() -> anyhow::Result<()> {
        let native = [1.0, 2.0];
        let docker = [3.0, 4.0, 5.0];
        let comparisons = pairwise_significance(&[("native", &native), ("docker", &docker)])?;

        assert_eq!(comparisons.len(), 1);
        assert!(matches!(
            comparisons[0].outcome,
            PairOutcome::Skipped { .. }
        ));
        Ok(())
    }

    #[cfg(feature = "significance")]
    #[test]
    fn t_interval_of_three_samples() -> anyhow::Result<()> {
        let interval = confidence_interval(&[10.0, 20.0, 30.0], 0.95)?.expect("interval");

        // t(0.975, 2) = 4.302653
        let half_width = 10.0 / 3.0_f64.sqrt() * 4.302653;
        assert_close(interval.lower, 20.0 - half_width, 1e-3);
        assert_close(interval.upper, 20.0 + half_width, 1e-3);
        Ok(())
    }

    #[cfg(feature = "significance")]
    #[test]
    fn separated_samples_differ_significantly() -> anyhow::Result<()> {
        let (u, p) = mann_whitney_u(&[1.0, 2.0, 3.0, 4.0, 5.0], &[6.0, 7.0, 8.0, 9.0, 10.0])?
            .expect("test result");

        assert_eq!(u, 0.0);
        // Exact: 2 of the 252 orderings are as extreme
        assert_close(p, 2.0 / 252.0, 1e-12);
        assert_eq!(significance_marker(p), "**");
        Ok(())
    }

    #[test]
    fn exact_u_distribution_of_small_samples() {
        // n1 = n2 = 3: counts of U = 0..=9 are 1, 1, 2, 3, 3, 3, 3, 2, 1, 1 out of 20
        assert_close(exact_u_cdf(0, 3, 3), 1.0 / 20.0, 1e-12);
        assert_close(exact_u_cdf(2, 3, 3), 4.0 / 20.0, 1e-12);
        assert_close(exact_u_cdf(9, 3, 3), 1.0, 1e-12);
        // n1 = 2, n2 = 4: counts of U = 0..=8 are 1, 1, 2, 2, 3, 2, 2, 1, 1 out of 15
        assert_close(exact_u_cdf(3, 2, 4), 6.0 / 15.0, 1e-12);
        assert_close(exact_u_cdf(3, 4, 2), 6.0 / 15.0, 1e-12);
    }

    #[cfg(feature = "significance")]
    #[test]
    fn interleaved_small_samples_use_exact_p_value() -> anyhow::Result<()> {
        let (u, p) = mann_whitney_u(&[1.0, 3.0, 5.0], &[2.0, 4.0, 6.0])?.expect("test result");

        // U1 = 3, P(U <= 3) = 7/20
        assert_eq!(u, 3.0);
        assert_close(p, 0.7, 1e-12);
        Ok(())
    }

    #[cfg(feature = "significance")]
    #[test]
    fn large_samples_use_normal_approximation() -> anyhow::Result<()> {
        let first = (0..10).map(f64::from).collect::<Vec<_>>();
        let second = (10..20).map(f64::from).collect::<Vec<_>>();
        let (u, p) = mann_whitney_u(&first, &second)?.expect("test result");

        // z = (100 - 50 - 0.5) / sqrt(100 * 21 / 12)
        assert_eq!(u, 0.0);
        assert_close(p, 0.000183, 1e-5);
        Ok(())
    }

    #[cfg(feature = "significance")]
    #[test]
    fn ties_use_normal_approximation() -> anyhow::Result<()> {
        let (_, p) =
            mann_whitney_u(&[1.0, 2.0, 2.0, 3.0], &[2.0, 4.0, 5.0, 6.0])?.expect("test result");

        assert!(p > 0.0 && p < 1.0, "p was {p}");
        Ok(())
    }

    // Run with `cargo test --no-default-features`
    #[cfg(not(feature = "significance"))]
    #[test]
    fn without_significance_intervals_and_tests_are_skipped() -> anyhow::Result<()> {
        assert_eq!(confidence_interval(&[1.0, 2.0, 3.0], 0.95)?, None);

        let stats = standard_stats(&[1.0, 2.0, 3.0])?;
        assert_eq!(stats.confidence_interval, None);
        assert_close(stats.mean, 2.0, 1e-9);

        let native = [1.0, 2.0, 3.0];
        let docker = [4.0, 5.0, 6.0];
        let comparisons = pairwise_significance(&[("native", &native), ("docker", &docker)])?;
        assert!(comparisons.is_empty());
        assert_eq!(mann_whitney_u(&native, &docker)?, None);
        Ok(())
    }

    #[cfg(feature = "significance")]
    #[test]
    fn identical_samples_are_not_significant() -> anyhow::Result<()> {
        let (_, p) = mann_whitney_u(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0])?.expect("test result");

        assert_eq!(p, 1.0);
        Ok(())
    }

    #[cfg(feature = "significance")]
    #[test]
    fn pairs_are_tested_in_order() -> anyhow::Result<()> {
        let native = [9.0, 10.0, 11.0];
        let docker = [19.0, 20.0, 21.0];
        let wasm = [30.0, 31.0, 32.0];
        let comparisons = pairwise_significance(&[
            ("native", &native),
            ("docker", &docker),
            ("wasmtime", &wasm),
        ])?;

        let pairs = comparisons
            .iter()
            .map(|c| (c.first.as_str(), c.second.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![
                ("native", "docker"),
                ("native", "wasmtime"),
                ("docker", "wasmtime")
            ]
        );

        match &comparisons[0].outcome {
            PairOutcome::Tested(test) => {
                assert_close(test.diff_pct, 100.0, 1e-9);
            }
            other => panic!("Unexpected outcome: {other:?}"),
        }
        Ok(())
    }
}
