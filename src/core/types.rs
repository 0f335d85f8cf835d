use std::str::FromStr;

use serde::Serialize;

use super::error::{ProjectionError, Result};

pub const DEFAULT_PAYOUT_YEARS: f64 = 20.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Pessimistic,
    Neutral,
    Optimistic,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Pessimistic,
        Scenario::Neutral,
        Scenario::Optimistic,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Scenario::Pessimistic => "pessimistic",
            Scenario::Neutral => "neutral",
            Scenario::Optimistic => "optimistic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scenario::Pessimistic => "Tegenvallende markt (3%)",
            Scenario::Neutral => "Neutrale markt (6%)",
            Scenario::Optimistic => "Optimistisch (8%)",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Scenario::Pessimistic => "Voor conservatieve planning bij tegenvallende jaren",
            Scenario::Neutral => "Realistisch, lange termijn gemiddeld",
            Scenario::Optimistic => "Historisch haalbaar in goede jaren",
        }
    }

    fn default_rate(self) -> f64 {
        match self {
            Scenario::Pessimistic => 0.03,
            Scenario::Neutral => 0.06,
            Scenario::Optimistic => 0.08,
        }
    }
}

impl FromStr for Scenario {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pessimistic" | "bad" | "tegenvallend" | "tegenvallende-markt" => {
                Ok(Scenario::Pessimistic)
            }
            "neutral" | "neutraal" | "neutrale-markt" => Ok(Scenario::Neutral),
            "optimistic" | "good" | "optimistisch" => Ok(Scenario::Optimistic),
            other => Err(ProjectionError::UnknownScenario(other.to_string())),
        }
    }
}

/// Ordered mapping from scenario to annual return rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTable {
    entries: Vec<(Scenario, f64)>,
}

impl ScenarioTable {
    pub fn new(entries: Vec<(Scenario, f64)>) -> Result<Self> {
        for &(_, rate) in &entries {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ProjectionError::invalid(
                    "annual_rate",
                    format!("must be a finite value >= 0, got {rate}"),
                ));
            }
        }
        Ok(Self { entries })
    }

    pub fn rate(&self, scenario: Scenario) -> Result<f64> {
        self.entries
            .iter()
            .find(|(s, _)| *s == scenario)
            .map(|&(_, rate)| rate)
            .ok_or_else(|| ProjectionError::UnknownScenario(scenario.id().to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Scenario, f64)> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for ScenarioTable {
    fn default() -> Self {
        Self {
            entries: Scenario::ALL
                .iter()
                .map(|&s| (s, s.default_rate()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionConfig {
    pub payout_years: f64,
    pub scenarios: ScenarioTable,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            payout_years: DEFAULT_PAYOUT_YEARS,
            scenarios: ScenarioTable::default(),
        }
    }
}

/// Fixed monthly deposit over a whole number of years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionPlan {
    monthly_amount: f64,
    years: u32,
}

impl ContributionPlan {
    pub fn new(monthly_amount: f64, years: u32) -> Result<Self> {
        validate_monthly_amount(monthly_amount)?;
        validate_years(years)?;
        Ok(Self {
            monthly_amount,
            years,
        })
    }

    pub fn monthly_amount(&self) -> f64 {
        self.monthly_amount
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    pub fn total_contributed(&self) -> f64 {
        self.monthly_amount * 12.0 * self.years as f64
    }
}

pub(crate) fn validate_monthly_amount(monthly_amount: f64) -> Result<()> {
    if !monthly_amount.is_finite() || monthly_amount < 0.0 {
        return Err(ProjectionError::invalid(
            "monthly_amount",
            format!("must be a finite value >= 0, got {monthly_amount}"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_years(years: u32) -> Result<()> {
    if years < 1 {
        return Err(ProjectionError::invalid("years", "must be >= 1"));
    }
    Ok(())
}

pub(crate) fn validate_annual_rate(annual_rate: f64) -> Result<()> {
    if !annual_rate.is_finite() || annual_rate < 0.0 {
        return Err(ProjectionError::invalid(
            "annual_rate",
            format!("must be a finite value >= 0, got {annual_rate}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePoint {
    pub year: u32,
    pub balance: f64,
    pub contributed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub annual_rate: f64,
    pub payout_years: f64,
    pub future_value: f64,
    pub monthly_payout: f64,
    pub total_contributed: f64,
    pub total_growth: f64,
    pub balance_series: Vec<BalancePoint>,
}
