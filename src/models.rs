//! Artifact record shapes written by the backtest pipeline.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Summary statistics of one finished backtest run.
///
/// The same shape is used for the latest report and for every line of the
/// run history. Any missing field reads as zero/empty, so a partial object
/// still decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub created_at_utc: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub predict_horizon: u64,
    #[serde(default)]
    pub fee_rate: f64,
    #[serde(default)]
    pub initial_balance: f64,
    #[serde(default)]
    pub final_equity: f64,
    #[serde(default)]
    pub equity_curve_len: u64,
    #[serde(default)]
    pub total_return_pct: f64,
    #[serde(default)]
    pub buy_hold_return_pct: f64,
    #[serde(default)]
    pub max_drawdown_pct: f64,
    #[serde(default)]
    pub annualized_sharpe: f64,
    #[serde(default)]
    pub calmar_ratio: f64,
    #[serde(default)]
    pub closed_trades: u64,
    #[serde(default)]
    pub wins: u64,
    #[serde(default)]
    pub losses: u64,
    #[serde(default)]
    pub win_rate_pct: f64,
    #[serde(default)]
    pub exposure_pct: f64,
    #[serde(default)]
    pub model_validation_accuracy: f64,
    #[serde(default)]
    pub report_path: String,
}

impl Report {
    /// Strategy return minus buy-and-hold return, in percentage points.
    pub fn model_edge(&self) -> f64 {
        self.total_return_pct - self.buy_hold_return_pct
    }
}

impl Default for Report {
    /// Synthetic sample run shown when no report has been produced yet.
    fn default() -> Self {
        Self {
            run_id: "sample".to_string(),
            created_at_utc: DateTime::<Utc>::UNIX_EPOCH
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            mode: "backtest".to_string(),
            symbol: "BTC/USDT".to_string(),
            timeframe: "1h".to_string(),
            data_source: "sample csv".to_string(),
            predict_horizon: 1,
            fee_rate: 0.001,
            initial_balance: 10_000.0,
            final_equity: 10_000.0,
            equity_curve_len: 0,
            total_return_pct: 0.0,
            buy_hold_return_pct: 0.0,
            max_drawdown_pct: 0.0,
            annualized_sharpe: 0.0,
            calmar_ratio: 0.0,
            closed_trades: 0,
            wins: 0,
            losses: 0,
            win_rate_pct: 0.0,
            exposure_pct: 0.0,
            model_validation_accuracy: 0.0,
            report_path: "reports/sample-report.json".to_string(),
        }
    }
}

/// Strategy/run configuration. Absent fields take the default config's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub symbol: String,
    pub timeframe: String,
    pub initial_balance: f64,
    pub fee_rate: f64,
    pub train_window: u64,
    pub predict_horizon: u64,
    pub model_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_model: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: "1h".to_string(),
            initial_balance: 10_000.0,
            fee_rate: 0.001,
            train_window: 500,
            predict_horizon: 1,
            model_type: "random_forest".to_string(),
            data_mode: None,
            exchange_name: None,
            limit: None,
            report_dir: None,
            save_model: None,
            model_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: String,
    pub equity: f64,
}
