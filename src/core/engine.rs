use log::debug;

use super::error::{ProjectionError, Result};
use super::types::{
    BalancePoint, ContributionPlan, ProjectionConfig, ProjectionResult, Scenario,
    validate_annual_rate, validate_monthly_amount, validate_years,
};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Future value of an ordinary annuity of `monthly_amount` deposited at the end
/// of every month for `years`, compounded monthly at `annual_rate / 12`.
pub fn future_value(monthly_amount: f64, annual_rate: f64, years: u32) -> Result<f64> {
    validate_monthly_amount(monthly_amount)?;
    validate_annual_rate(annual_rate)?;
    validate_years(years)?;
    annuity_future_value(monthly_amount, annual_rate, years)
}

/// Linear depletion of `future_value` over `payout_years`, ignoring any growth
/// during the payout phase.
pub fn monthly_payout(future_value: f64, payout_years: f64) -> Result<f64> {
    if !future_value.is_finite() || future_value < 0.0 {
        return Err(ProjectionError::invalid(
            "future_value",
            format!("must be a finite value >= 0, got {future_value}"),
        ));
    }
    if !payout_years.is_finite() || payout_years <= 0.0 {
        return Err(ProjectionError::invalid(
            "payout_years",
            format!("must be a finite value > 0, got {payout_years}"),
        ));
    }
    Ok(future_value / (payout_years * MONTHS_PER_YEAR))
}

/// Balance at the end of every year `1..=years`, each one the annuity future
/// value at that horizon.
pub fn balance_series(
    monthly_amount: f64,
    annual_rate: f64,
    years: u32,
) -> Result<Vec<BalancePoint>> {
    validate_monthly_amount(monthly_amount)?;
    validate_annual_rate(annual_rate)?;
    validate_years(years)?;

    (1..=years)
        .map(|year| {
            Ok(BalancePoint {
                year,
                balance: annuity_future_value(monthly_amount, annual_rate, year)?,
                contributed: monthly_amount * MONTHS_PER_YEAR * year as f64,
            })
        })
        .collect()
}

pub fn project(
    plan: &ContributionPlan,
    annual_rate: f64,
    config: &ProjectionConfig,
) -> Result<ProjectionResult> {
    let future_value = future_value(plan.monthly_amount(), annual_rate, plan.years())?;
    let monthly_payout = monthly_payout(future_value, config.payout_years)?;
    let balance_series = balance_series(plan.monthly_amount(), annual_rate, plan.years())?;
    let total_contributed = plan.total_contributed();

    debug!(
        "projected {} x {} years at {:.4}: fv={future_value:.2} payout={monthly_payout:.2}",
        plan.monthly_amount(),
        plan.years(),
        annual_rate
    );

    Ok(ProjectionResult {
        annual_rate,
        payout_years: config.payout_years,
        future_value,
        monthly_payout,
        total_contributed,
        total_growth: (future_value - total_contributed).max(0.0),
        balance_series,
    })
}

pub fn project_scenario(
    plan: &ContributionPlan,
    scenario: Scenario,
    config: &ProjectionConfig,
) -> Result<ProjectionResult> {
    let annual_rate = config.scenarios.rate(scenario)?;
    project(plan, annual_rate, config)
}

/// Projects the plan under every scenario in the table, in table order.
pub fn compare_scenarios(
    plan: &ContributionPlan,
    config: &ProjectionConfig,
) -> Result<Vec<(Scenario, ProjectionResult)>> {
    config
        .scenarios
        .iter()
        .map(|(scenario, rate)| project(plan, rate, config).map(|result| (scenario, result)))
        .collect()
}

fn annuity_future_value(monthly_amount: f64, annual_rate: f64, years: u32) -> Result<f64> {
    if monthly_amount == 0.0 {
        return Ok(0.0);
    }
    let periods = MONTHS_PER_YEAR * years as f64;
    let monthly_rate = annual_rate / MONTHS_PER_YEAR;
    if monthly_rate == 0.0 {
        return Ok(monthly_amount * periods);
    }

    // ((1 + r)^n - 1) / r, kept accurate for tiny r
    let fv = monthly_amount * ((periods * monthly_rate.ln_1p()).exp_m1() / monthly_rate);
    if !fv.is_finite() {
        return Err(ProjectionError::invalid(
            "years",
            format!("{years} years at {annual_rate} overflows the future value"),
        ));
    }
    Ok(fv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_plan() -> ContributionPlan {
        ContributionPlan::new(300.0, 30).expect("valid plan")
    }

    #[test]
    fn oracle_neutral_scenario_matches_closed_form() {
        // 300 * ((1.005^360 - 1) / 0.005)
        let fv = future_value(300.0, 0.06, 30).expect("valid inputs");
        assert_approx_tol(fv, 301_354.51, 0.01);
    }

    #[test]
    fn oracle_pessimistic_and_optimistic_scenarios_match_closed_form() {
        let low = future_value(300.0, 0.03, 30).expect("valid inputs");
        let high = future_value(300.0, 0.08, 30).expect("valid inputs");
        assert_approx_tol(low, 174_821.07, 0.01);
        assert_approx_tol(high, 447_107.83, 0.01);
    }

    #[test]
    fn oracle_single_year_matches_hand_calculation() {
        // 100 * ((1.005^12 - 1) / 0.005) = 1233.5562...
        let fv = future_value(100.0, 0.06, 1).expect("valid inputs");
        assert_approx_tol(fv, 1_233.556_237, 1e-5);
    }

    #[test]
    fn zero_rate_is_the_plain_sum_of_deposits() {
        let fv = future_value(250.0, 0.0, 7).expect("zero rate is valid");
        assert_approx(fv, 250.0 * 12.0 * 7.0);
        assert!(fv.is_finite());
    }

    #[test]
    fn future_value_rejects_invalid_arguments() {
        for (amount, rate, years, field) in [
            (-1.0, 0.06, 30, "monthly_amount"),
            (300.0, 0.06, 0, "years"),
            (300.0, -0.01, 30, "annual_rate"),
            (f64::NAN, 0.06, 30, "monthly_amount"),
            (300.0, f64::INFINITY, 30, "annual_rate"),
        ] {
            let err = future_value(amount, rate, years).expect_err("must reject");
            match err {
                ProjectionError::InvalidArgument { field: got, .. } => assert_eq!(got, field),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn zero_deposits_stay_zero_at_any_horizon() {
        assert_eq!(future_value(0.0, 0.08, 10_000), Ok(0.0));
        let series = balance_series(0.0, 0.08, 10_000).expect("zero deposits are valid");
        assert_eq!(series.len(), 10_000);
        assert!(series.iter().all(|p| p.balance == 0.0));
    }

    #[test]
    fn overflowing_horizon_is_rejected_as_invalid_years() {
        for result in [
            future_value(300.0, 0.08, 10_000).map(|_| ()),
            balance_series(300.0, 0.08, 10_000).map(|_| ()),
            project(
                &ContributionPlan::new(300.0, 10_000).expect("valid plan"),
                0.08,
                &ProjectionConfig::default(),
            )
            .map(|_| ()),
        ] {
            match result {
                Err(ProjectionError::InvalidArgument { field, .. }) => assert_eq!(field, "years"),
                other => panic!("unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn tiny_positive_rate_still_compounds() {
        let deposits = 100.0 * 12.0 * 10.0;
        let fv = future_value(100.0, 1e-10, 10).expect("valid inputs");
        assert!(fv > deposits);
        assert_approx_tol(fv, deposits, 1e-3);
    }

    #[test]
    fn monthly_payout_divides_over_payout_months() {
        let payout = monthly_payout(240_000.0, 20.0).expect("valid inputs");
        assert_approx(payout, 1_000.0);
        assert_approx(monthly_payout(0.0, 20.0).expect("zero balance"), 0.0);
        assert_approx(monthly_payout(1_200.0, 0.5).expect("half a year"), 200.0);
    }

    #[test]
    fn monthly_payout_rejects_non_positive_horizon() {
        assert!(monthly_payout(1_000.0, 0.0).is_err());
        assert!(monthly_payout(1_000.0, -5.0).is_err());
        assert!(monthly_payout(-1.0, 20.0).is_err());
        assert!(monthly_payout(1_000.0, f64::NAN).is_err());
    }

    #[test]
    fn balance_series_rejects_invalid_arguments() {
        assert!(balance_series(300.0, 0.06, 0).is_err());
        assert!(balance_series(-1.0, 0.06, 10).is_err());
    }

    #[test]
    fn project_assembles_consistent_result() {
        let config = ProjectionConfig::default();
        let result = project(&sample_plan(), 0.06, &config).expect("valid projection");

        assert_approx_tol(result.future_value, 301_354.51, 0.01);
        assert_approx(result.monthly_payout * 240.0, result.future_value);
        assert_approx(result.total_contributed, 108_000.0);
        assert_approx(
            result.total_growth,
            result.future_value - result.total_contributed,
        );
        assert_eq!(result.balance_series.len(), 30);
        assert_approx(result.payout_years, 20.0);
        let last = result.balance_series.last().expect("non-empty series");
        assert_eq!(last.year, 30);
        assert_approx(last.balance, result.future_value);
        assert_approx(last.contributed, 108_000.0);
    }

    #[test]
    fn project_uses_configured_payout_horizon() {
        let config = ProjectionConfig {
            payout_years: 25.0,
            ..ProjectionConfig::default()
        };
        let result = project(&sample_plan(), 0.06, &config).expect("valid projection");
        assert_approx(result.monthly_payout, result.future_value / 300.0);

        let bad = ProjectionConfig {
            payout_years: 0.0,
            ..ProjectionConfig::default()
        };
        assert!(project(&sample_plan(), 0.06, &bad).is_err());
    }

    #[test]
    fn project_scenario_resolves_rate_from_table() {
        let config = ProjectionConfig::default();
        let result =
            project_scenario(&sample_plan(), Scenario::Optimistic, &config).expect("in table");
        assert_approx(result.annual_rate, 0.08);
        assert_approx_tol(result.future_value, 447_107.83, 0.01);
    }

    #[test]
    fn compare_scenarios_follows_table_order_and_rates() {
        let results =
            compare_scenarios(&sample_plan(), &ProjectionConfig::default()).expect("valid");
        let order: Vec<_> = results.iter().map(|(s, _)| *s).collect();
        assert_eq!(order, Scenario::ALL.to_vec());
        assert!(results[0].1.future_value < results[1].1.future_value);
        assert!(results[1].1.future_value < results[2].1.future_value);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_growth_never_falls_below_sum_of_deposits(
            amount_cents in 0u32..500_000,
            rate_bp in 1u32..2_000,
            years in 1u32..60
        ) {
            let amount = amount_cents as f64 / 100.0;
            let rate = rate_bp as f64 / 10_000.0;
            let fv = future_value(amount, rate, years).expect("valid inputs");
            let deposits = amount * 12.0 * years as f64;
            prop_assert!(fv.is_finite());
            prop_assert!(fv >= deposits * (1.0 - 1e-12), "fv {} < deposits {}", fv, deposits);
        }

        #[test]
        fn prop_zero_rate_equals_deposits(
            amount_cents in 0u32..500_000,
            years in 1u32..80
        ) {
            let amount = amount_cents as f64 / 100.0;
            let fv = future_value(amount, 0.0, years).expect("valid inputs");
            prop_assert!((fv - amount * 12.0 * years as f64).abs() <= 1e-6);
        }

        #[test]
        fn prop_future_value_strictly_increases_with_horizon(
            amount_cents in 1u32..500_000,
            rate_bp in 1u32..2_000,
            years in 1u32..60
        ) {
            let amount = amount_cents as f64 / 100.0;
            let rate = rate_bp as f64 / 10_000.0;
            let shorter = future_value(amount, rate, years).expect("valid inputs");
            let longer = future_value(amount, rate, years + 1).expect("valid inputs");
            prop_assert!(longer > shorter);
        }

        #[test]
        fn prop_series_has_one_entry_per_year_ending_at_future_value(
            amount_cents in 0u32..500_000,
            rate_bp in 0u32..2_000,
            years in 1u32..60
        ) {
            let amount = amount_cents as f64 / 100.0;
            let rate = rate_bp as f64 / 10_000.0;
            let series = balance_series(amount, rate, years).expect("valid inputs");
            prop_assert_eq!(series.len(), years as usize);
            for (idx, point) in series.iter().enumerate() {
                prop_assert_eq!(point.year, idx as u32 + 1);
                prop_assert!(point.balance >= 0.0);
            }
            let last = series.last().expect("non-empty series");
            let fv = future_value(amount, rate, years).expect("valid inputs");
            prop_assert_eq!(last.balance, fv);
        }

        #[test]
        fn prop_twenty_year_payout_reconstructs_future_value(
            fv_cents in 0u64..10_000_000_000
        ) {
            let fv = fv_cents as f64 / 100.0;
            let payout = monthly_payout(fv, 20.0).expect("valid inputs");
            prop_assert!((payout * 240.0 - fv).abs() <= fv.max(1.0) * 1e-12);
        }
    }
}
