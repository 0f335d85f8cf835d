mod engine;
mod error;
mod format;
mod types;

pub use engine::{
    balance_series, compare_scenarios, future_value, monthly_payout, project, project_scenario,
};
pub use error::{ProjectionError, Result};
pub use format::format_euro;
pub use types::{
    BalancePoint, ContributionPlan, DEFAULT_PAYOUT_YEARS, ProjectionConfig, ProjectionResult,
    Scenario, ScenarioTable,
};
