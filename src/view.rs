//! View model for the dashboard page: every string here is ready to drop
//! into markup (formatted and HTML-escaped).

use crate::{
    chart::ChartBox,
    models::{BotConfig, EquityPoint, Report},
    store::ArtifactStore,
    utils::round_half_away,
};

pub const PAGE_HISTORY_CAP: usize = 50;
pub const PAGE_EQUITY_CAP: usize = 600;
pub const PAGE_CLOSE_CAP: usize = 220;
pub const RECENT_RUNS: usize = 8;

pub const EQUITY_CHART: ChartBox = ChartBox::new(820.0, 220.0);
pub const CLOSE_CHART: ChartBox = ChartBox::new(820.0, 140.0);

pub const EMPTY_HISTORY_HINT: &str =
    "No history found yet. Run `./.venv/bin/python -m src.bot --mode backtest --save_model`.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Good,
    Bad,
}

impl Tone {
    pub fn of(value: f64) -> Self {
        if value >= 0.0 {
            Tone::Good
        } else {
            Tone::Bad
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Tone::Neutral => "",
            Tone::Good => "good",
            Tone::Bad => "bad",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub label: &'static str,
    pub value: String,
    pub tone: Tone,
}

impl Card {
    fn plain(label: &'static str, value: String) -> Self {
        Self {
            label,
            value,
            tone: Tone::Neutral,
        }
    }

    fn toned(label: &'static str, value: f64) -> Self {
        Self {
            label,
            value: fmt_pct(value),
            tone: Tone::of(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub run_id: String,
    pub created_at: String,
    pub total_return: String,
    pub return_tone: Tone,
    pub max_drawdown: String,
    pub sharpe: String,
    pub closed_trades: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub symbol: String,
    pub timeframe: String,
    pub snapshot: Vec<Card>,
    pub latest_timestamp: String,
    pub metrics: Vec<Card>,
    pub equity_path: String,
    pub equity_points: usize,
    pub control_panel: Vec<(&'static str, String)>,
    pub close_path: String,
    pub close_count: usize,
    pub stored_runs: usize,
    pub recent_runs: Vec<HistoryRow>,
}

impl DashboardView {
    /// Fetch every artifact concurrently and assemble the page.
    pub async fn load(store: &ArtifactStore) -> Self {
        let (report, config, history, equity, closes) = tokio::join!(
            store.get_report(),
            store.get_config(),
            store.get_history(PAGE_HISTORY_CAP),
            store.get_equity_curve(PAGE_EQUITY_CAP),
            store.get_price_closes(PAGE_CLOSE_CAP),
        );
        Self::assemble(&report, &config, &history, &equity, &closes)
    }

    pub fn assemble(
        report: &Report,
        config: &BotConfig,
        history: &[Report],
        equity: &[EquityPoint],
        closes: &[f64],
    ) -> Self {
        let equity_values: Vec<f64> = equity.iter().map(|p| p.equity).collect();
        let latest_timestamp = equity
            .last()
            .map(|p| p.timestamp.as_str())
            .unwrap_or(&report.created_at_utc);

        let snapshot = vec![
            Card::plain("Final Equity", fmt_currency(report.final_equity)),
            Card::plain("Model Acc", fmt_pct(report.model_validation_accuracy * 100.0)),
            Card::toned("Strategy Return", report.total_return_pct),
            Card::toned("vs Buy/Hold", report.model_edge()),
        ];

        let metrics = vec![
            Card::plain("Sharpe", fmt_number(report.annualized_sharpe)),
            Card::plain("Max Drawdown", fmt_pct(report.max_drawdown_pct)),
            Card::plain("Win Rate", fmt_pct(report.win_rate_pct)),
            Card::plain("Closed Trades", fmt_number(report.closed_trades as f64)),
        ];

        let control_panel = vec![
            ("Symbol", escape_html(&config.symbol)),
            ("Timeframe", escape_html(&config.timeframe)),
            ("Model", escape_html(&config.model_type)),
            ("Predict horizon", config.predict_horizon.to_string()),
            ("Fee rate", config.fee_rate.to_string()),
            ("Initial balance", fmt_currency(config.initial_balance)),
            ("Exposure", fmt_pct(report.exposure_pct)),
            ("Calmar", fmt_number(report.calmar_ratio)),
        ];

        let recent_runs = history
            .iter()
            .take(RECENT_RUNS)
            .map(|run| HistoryRow {
                run_id: escape_html(&run.run_id),
                created_at: escape_html(&run.created_at_utc),
                total_return: fmt_pct(run.total_return_pct),
                return_tone: Tone::of(run.total_return_pct),
                max_drawdown: fmt_pct(run.max_drawdown_pct),
                sharpe: fmt_number(run.annualized_sharpe),
                closed_trades: run.closed_trades.to_string(),
            })
            .collect();

        Self {
            symbol: escape_html(&config.symbol),
            timeframe: escape_html(&config.timeframe),
            snapshot,
            latest_timestamp: escape_html(latest_timestamp),
            metrics,
            equity_path: EQUITY_CHART.path(&equity_values),
            equity_points: equity_values.len(),
            control_panel,
            close_path: CLOSE_CHART.path(closes),
            close_count: closes.len(),
            stored_runs: history.len(),
            recent_runs,
        }
    }
}

/// en-US style: at most two fraction digits, thousands grouped.
pub fn fmt_number(value: f64) -> String {
    format_grouped(value, 2)
}

pub fn fmt_pct(value: f64) -> String {
    format!("{}%", fmt_number(value))
}

/// US dollars without cents, e.g. `$10,250` or `-$1,200`.
pub fn fmt_currency(value: f64) -> String {
    let s = format_grouped(value, 0);
    match s.strip_prefix('-') {
        Some(rest) => format!("-${rest}"),
        None => format!("${s}"),
    }
}

fn format_grouped(value: f64, max_fraction: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = round_half_away(value.abs(), max_fraction as i32);
    let fixed = format!("{:.*}", max_fraction, rounded);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }

    let is_zero = grouped.chars().all(|c| c == '0' || c == '.' || c == ',');
    if value < 0.0 && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// HTML-escape artifact text with askama's `Html` escaper.
pub fn escape_html(raw: &str) -> String {
    askama::filters::escape(askama::Html, raw)
        .map(|markup| markup.to_string())
        .unwrap_or_default()
}
