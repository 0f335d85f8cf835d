use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    ContributionPlan, DEFAULT_PAYOUT_YEARS, ProjectionConfig, ProjectionError, ProjectionResult,
    Scenario, ScenarioTable, compare_scenarios, format_euro, project_scenario,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MIN_START_AGE: u32 = 18;
const MAX_START_AGE: u32 = 70;
const MAX_YEARS: u32 = 100;

const DISCLAIMER: [&str; 3] = [
    "Dit is een indicatie op basis van historische gemiddelden.",
    "Werkelijke rendementen kunnen hoger of lager uitvallen.",
    "Deze tool houdt geen rekening met belastingen, inflatie of kosten.",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliScenario {
    Pessimistic,
    Neutral,
    Optimistic,
}

impl From<CliScenario> for Scenario {
    fn from(value: CliScenario) -> Self {
        match value {
            CliScenario::Pessimistic => Scenario::Pessimistic,
            CliScenario::Neutral => Scenario::Neutral,
            CliScenario::Optimistic => Scenario::Optimistic,
        }
    }
}

impl From<Scenario> for CliScenario {
    fn from(value: Scenario) -> Self {
        match value {
            Scenario::Pessimistic => CliScenario::Pessimistic,
            Scenario::Neutral => CliScenario::Neutral,
            Scenario::Optimistic => CliScenario::Optimistic,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(try_from = "String")]
struct ApiScenario(Scenario);

impl TryFrom<String> for ApiScenario {
    type Error = ProjectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map(ApiScenario)
    }
}

impl From<ApiScenario> for CliScenario {
    fn from(value: ApiScenario) -> Self {
        value.0.into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    monthly_amount: Option<f64>,
    years: Option<u32>,
    start_age: Option<u32>,
    scenario: Option<ApiScenario>,
    payout_years: Option<f64>,
    pessimistic_rate: Option<f64>,
    neutral_rate: Option<f64>,
    optimistic_rate: Option<f64>,
    compare: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "rendement",
    about = "Projected value of fixed monthly contributions under three market scenarios"
)]
struct Cli {
    #[arg(long, default_value_t = 300.0, help = "Monthly contribution in euros")]
    monthly_amount: f64,
    #[arg(long, default_value_t = 30, help = "Number of years contributing")]
    years: u32,
    #[arg(
        long,
        default_value_t = 30,
        help = "Age at the first contribution, used to label the yearly balances"
    )]
    start_age: u32,
    #[arg(long, value_enum, default_value_t = CliScenario::Neutral)]
    scenario: CliScenario,
    #[arg(
        long,
        default_value_t = DEFAULT_PAYOUT_YEARS,
        help = "Years over which the final balance is paid out"
    )]
    payout_years: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Annual return of the pessimistic scenario in percent"
    )]
    pessimistic_rate: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Annual return of the neutral scenario in percent"
    )]
    neutral_rate: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Annual return of the optimistic scenario in percent"
    )]
    optimistic_rate: f64,
    #[arg(long, help = "Also project every scenario side by side")]
    compare: bool,
}

#[derive(Debug)]
struct ProjectionRequest {
    plan: ContributionPlan,
    start_age: u32,
    scenario: Scenario,
    config: ProjectionConfig,
    compare: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesRow {
    year: u32,
    age: u32,
    balance: f64,
    contributed: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonRow {
    scenario: Scenario,
    scenario_label: &'static str,
    annual_rate: f64,
    future_value: f64,
    monthly_payout: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    scenario: Scenario,
    scenario_label: &'static str,
    annual_rate: f64,
    payout_years: f64,
    start_age: u32,
    years: u32,
    monthly_amount: f64,
    future_value: f64,
    future_value_display: String,
    monthly_payout: f64,
    monthly_payout_display: String,
    total_contributed: f64,
    total_growth: f64,
    balance_series: Vec<SeriesRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comparison: Vec<ComparisonRow>,
    disclaimer: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioEntry {
    id: Scenario,
    label: &'static str,
    explanation: &'static str,
    annual_rate: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ProjectionRequest, String> {
    if !cli.monthly_amount.is_finite() || cli.monthly_amount < 0.0 {
        return Err("--monthly-amount must be >= 0".to_string());
    }

    if !(1..=MAX_YEARS).contains(&cli.years) {
        return Err(format!("--years must be between 1 and {MAX_YEARS}"));
    }

    if !(MIN_START_AGE..=MAX_START_AGE).contains(&cli.start_age) {
        return Err(format!(
            "--start-age must be between {MIN_START_AGE} and {MAX_START_AGE}"
        ));
    }

    if !cli.payout_years.is_finite() || cli.payout_years <= 0.0 {
        return Err("--payout-years must be > 0".to_string());
    }

    for (name, rate) in [
        ("--pessimistic-rate", cli.pessimistic_rate),
        ("--neutral-rate", cli.neutral_rate),
        ("--optimistic-rate", cli.optimistic_rate),
    ] {
        if !rate.is_finite() || rate < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    let scenarios = ScenarioTable::new(vec![
        (Scenario::Pessimistic, cli.pessimistic_rate / 100.0),
        (Scenario::Neutral, cli.neutral_rate / 100.0),
        (Scenario::Optimistic, cli.optimistic_rate / 100.0),
    ])
    .map_err(|e| e.to_string())?;
    let plan = ContributionPlan::new(cli.monthly_amount, cli.years).map_err(|e| e.to_string())?;

    Ok(ProjectionRequest {
        plan,
        start_age: cli.start_age,
        scenario: cli.scenario.into(),
        config: ProjectionConfig {
            payout_years: cli.payout_years,
            scenarios,
        },
        compare: cli.compare,
    })
}

/// Parses command-line flags, runs one projection and renders it as text.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => return Ok(e.to_string()),
        Err(e) => return Err(e.to_string()),
    };
    let request = build_request(cli)?;
    let result = project_scenario(&request.plan, request.scenario, &request.config)
        .map_err(|e| e.to_string())?;
    let comparison = if request.compare {
        compare_scenarios(&request.plan, &request.config).map_err(|e| e.to_string())?
    } else {
        Vec::new()
    };
    Ok(render_text(&request, &result, &comparison))
}

fn render_text(
    request: &ProjectionRequest,
    result: &ProjectionResult,
    comparison: &[(Scenario, ProjectionResult)],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scenario: {}", request.scenario.label());
    let _ = writeln!(
        out,
        "Verwachte eindwaarde na {} jaar: {}",
        request.plan.years(),
        format_euro(result.future_value)
    );
    let _ = writeln!(
        out,
        "Bij uitkering over {} jaar: ca. {} per maand",
        result.payout_years,
        format_euro(result.monthly_payout)
    );
    let _ = writeln!(
        out,
        "Totaal ingelegd: {}, rendement: {}",
        format_euro(result.total_contributed),
        format_euro(result.total_growth)
    );
    out.push('\n');

    let _ = writeln!(out, "{:>5} {:>9} {:>16} {:>16}", "Jaar", "Leeftijd", "Saldo", "Ingelegd");
    for point in &result.balance_series {
        let _ = writeln!(
            out,
            "{:>5} {:>9} {:>16} {:>16}",
            point.year,
            request.start_age + point.year,
            format_euro(point.balance),
            format_euro(point.contributed)
        );
    }

    if !comparison.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{:<28} {:>16} {:>14}", "Scenario", "Eindwaarde", "Per maand");
        for (scenario, row) in comparison {
            let _ = writeln!(
                out,
                "{:<28} {:>16} {:>14}",
                scenario.label(),
                format_euro(row.future_value),
                format_euro(row.monthly_payout)
            );
        }
    }

    out.push('\n');
    for line in DISCLAIMER {
        let _ = writeln!(out, "- {line}");
    }
    out
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/scenarios", get(scenarios_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("rendement HTTP API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn scenarios_handler() -> Response {
    json_response(
        StatusCode::OK,
        scenario_entries(&ProjectionConfig::default().scenarios),
    )
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    match request_from_payload(payload).and_then(|request| build_project_response(&request)) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            warn!("rejected projection request: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn scenario_entries(table: &ScenarioTable) -> Vec<ScenarioEntry> {
    table
        .iter()
        .map(|(scenario, annual_rate)| ScenarioEntry {
            id: scenario,
            label: scenario.label(),
            explanation: scenario.explanation(),
            annual_rate,
        })
        .collect()
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: ProjectPayload) -> Result<ProjectionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.monthly_amount {
        cli.monthly_amount = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.start_age {
        cli.start_age = v;
    }
    if let Some(v) = payload.scenario {
        cli.scenario = v.into();
    }
    if let Some(v) = payload.payout_years {
        cli.payout_years = v;
    }
    if let Some(v) = payload.pessimistic_rate {
        cli.pessimistic_rate = v;
    }
    if let Some(v) = payload.neutral_rate {
        cli.neutral_rate = v;
    }
    if let Some(v) = payload.optimistic_rate {
        cli.optimistic_rate = v;
    }
    if let Some(v) = payload.compare {
        cli.compare = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        monthly_amount: 300.0,
        years: 30,
        start_age: 30,
        scenario: CliScenario::Neutral,
        payout_years: DEFAULT_PAYOUT_YEARS,
        pessimistic_rate: 3.0,
        neutral_rate: 6.0,
        optimistic_rate: 8.0,
        compare: false,
    }
}

fn build_project_response(request: &ProjectionRequest) -> Result<ProjectResponse, String> {
    let result = project_scenario(&request.plan, request.scenario, &request.config)
        .map_err(|e| e.to_string())?;
    let comparison = if request.compare {
        compare_scenarios(&request.plan, &request.config)
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|(scenario, row)| ComparisonRow {
                scenario,
                scenario_label: scenario.label(),
                annual_rate: row.annual_rate,
                future_value: row.future_value,
                monthly_payout: row.monthly_payout,
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(ProjectResponse {
        scenario: request.scenario,
        scenario_label: request.scenario.label(),
        annual_rate: result.annual_rate,
        payout_years: result.payout_years,
        start_age: request.start_age,
        years: request.plan.years(),
        monthly_amount: request.plan.monthly_amount(),
        future_value: result.future_value,
        future_value_display: format_euro(result.future_value),
        monthly_payout: result.monthly_payout,
        monthly_payout_display: format_euro(result.monthly_payout),
        total_contributed: result.total_contributed,
        total_growth: result.total_growth,
        balance_series: result
            .balance_series
            .iter()
            .map(|point| SeriesRow {
                year: point.year,
                age: request.start_age + point.year,
                balance: point.balance,
                contributed: point.contributed,
            })
            .collect(),
        comparison,
        disclaimer: &DISCLAIMER,
    })
}
