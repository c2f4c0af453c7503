use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::{
    error::ArtifactError,
    models::{BotConfig, EquityPoint, Report},
    utils::{parse_number, tail},
};

pub const REPORT_FILE: &str = "reports/sample-report.json";
pub const CONFIG_FILE: &str = "config/bot.config.json";
pub const HISTORY_FILE: &str = "reports/backtest-history.jsonl";
pub const EQUITY_FILE: &str = "reports/latest-equity-curve.csv";
pub const SAMPLE_DATA_FILE: &str = "reports/sample-data.csv";

pub const ARTIFACTS: [(&str, &str); 5] = [
    ("report", REPORT_FILE),
    ("config", CONFIG_FILE),
    ("history", HISTORY_FILE),
    ("equity", EQUITY_FILE),
    ("sample_data", SAMPLE_DATA_FILE),
];

/// OHLCV column holding the close price (date,open,high,low,close,volume).
const CLOSE_COLUMN: usize = 4;

/// Read-only view over the artifacts the backtest pipeline leaves under one
/// root directory.
///
/// Nothing is cached: every call re-reads and re-parses its file. Missing or
/// broken artifacts degrade to the default record or an empty series.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    async fn read_text(&self, relative: &str) -> Result<String, ArtifactError> {
        let path = self.artifact_path(relative);
        // Invalid UTF-8 only spoils the rows it sits in.
        tokio::fs::read(&path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|source| ArtifactError::Unreadable { path, source })
    }

    pub async fn exists(&self, relative: &str) -> bool {
        tokio::fs::try_exists(self.artifact_path(relative))
            .await
            .unwrap_or(false)
    }

    pub async fn load_report(&self) -> Result<Report, ArtifactError> {
        let text = self.read_text(REPORT_FILE).await?;
        parse_json_object(&self.artifact_path(REPORT_FILE), &text)
    }

    pub async fn get_report(&self) -> Report {
        self.load_report().await.unwrap_or_else(|e| {
            log_fallback(&e);
            Report::default()
        })
    }

    pub async fn load_config(&self) -> Result<BotConfig, ArtifactError> {
        let text = self.read_text(CONFIG_FILE).await?;
        parse_json_object(&self.artifact_path(CONFIG_FILE), &text)
    }

    pub async fn get_config(&self) -> BotConfig {
        self.load_config().await.unwrap_or_else(|e| {
            log_fallback(&e);
            BotConfig::default()
        })
    }

    /// The `limit` most recent runs, newest first.
    pub async fn load_history(&self, limit: usize) -> Result<Vec<Report>, ArtifactError> {
        let text = self.read_text(HISTORY_FILE).await?;
        let mut runs = tail(parse_history(&text), limit);
        runs.reverse();
        Ok(runs)
    }

    pub async fn get_history(&self, limit: usize) -> Vec<Report> {
        self.load_history(limit).await.unwrap_or_else(|e| {
            log_fallback(&e);
            Vec::new()
        })
    }

    /// The last `limit` equity points, oldest first.
    pub async fn load_equity_curve(&self, limit: usize) -> Result<Vec<EquityPoint>, ArtifactError> {
        let text = self.read_text(EQUITY_FILE).await?;
        Ok(tail(parse_equity_csv(&text), limit))
    }

    pub async fn get_equity_curve(&self, limit: usize) -> Vec<EquityPoint> {
        self.load_equity_curve(limit).await.unwrap_or_else(|e| {
            log_fallback(&e);
            Vec::new()
        })
    }

    /// The last `limit` closing prices of the sample OHLCV data, oldest first.
    pub async fn load_price_closes(&self, limit: usize) -> Result<Vec<f64>, ArtifactError> {
        let text = self.read_text(SAMPLE_DATA_FILE).await?;
        Ok(tail(parse_close_series(&text), limit))
    }

    pub async fn get_price_closes(&self, limit: usize) -> Vec<f64> {
        self.load_price_closes(limit).await.unwrap_or_else(|e| {
            log_fallback(&e);
            Vec::new()
        })
    }
}

fn log_fallback(err: &ArtifactError) {
    if err.is_missing() {
        log::debug!("artifact.missing {}", err);
    } else {
        log::warn!("artifact.fallback {}", err);
    }
}

pub fn parse_json_object<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T, ArtifactError> {
    serde_json::from_str(text).map_err(|e| ArtifactError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Parse JSONL run history in file order. Blank lines are skipped and lines
/// that do not decode as a report are dropped on their own.
pub fn parse_history(text: &str) -> Vec<Report> {
    text.lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<Report>(line) {
            Ok(report) => Some(report),
            Err(e) => {
                log::debug!("history.line_dropped line={} err={}", idx + 1, e);
                None
            }
        })
        .collect()
}

/// Data rows of a headed CSV text. Rows the reader rejects are dropped.
///
/// Quotes are plain text: a stray `"` fails its own row's number parse
/// instead of opening a field that runs into the rows after it.
fn csv_rows(text: &str) -> impl Iterator<Item = csv::StringRecord> + '_ {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes())
        .into_records()
        .filter_map(|row| match row {
            Ok(record) => Some(record),
            Err(e) => {
                log::debug!("csv.row_dropped err={}", e);
                None
            }
        })
}

/// Parse a `timestamp,equity` CSV. Rows with an empty timestamp or a
/// non-finite equity are dropped.
pub fn parse_equity_csv(text: &str) -> Vec<EquityPoint> {
    csv_rows(text)
        .filter_map(|record| {
            let timestamp = record.get(0).filter(|t| !t.is_empty())?;
            let equity = record
                .get(1)
                .and_then(parse_number)
                .filter(|v| v.is_finite())?;
            Some(EquityPoint {
                timestamp: timestamp.to_string(),
                equity,
            })
        })
        .collect()
}

/// Extract the close column from OHLCV CSV rows, dropping non-finite values.
pub fn parse_close_series(text: &str) -> Vec<f64> {
    csv_rows(text)
        .filter_map(|record| {
            record
                .get(CLOSE_COLUMN)
                .and_then(parse_number)
                .filter(|v| v.is_finite())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn report_line(run_id: &str, ret: f64) -> String {
        format!(
            r#"{{"run_id":"{run_id}","created_at_utc":"2024-01-01T00:00:00+00:00","symbol":"BTC/USDT","total_return_pct":{ret},"closed_trades":4,"wins":3,"losses":1}}"#
        )
    }

    fn write(dir: &TempDir, relative: &str, content: &str) {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn ids(runs: &[Report]) -> Vec<&str> {
        runs.iter().map(|r| r.run_id.as_str()).collect()
    }

    #[test]
    fn history_drops_bad_lines_and_keeps_file_order() {
        let text = format!(
            "{}\nnot json\n\n   \n{}\n{{\"run_id\": 7}}\n{}\n",
            report_line("a", 1.0),
            report_line("b", 2.0),
            report_line("c", 3.0)
        );
        let runs = parse_history(&text);
        assert_eq!(ids(&runs), vec!["a", "b", "c"]);
        assert_eq!(runs[2].total_return_pct, 3.0);
    }

    #[test]
    fn equity_csv_drops_non_numeric_rows() {
        let text = "timestamp,equity\nt0,100\nt1,150\nbad,xyz\nt2,200\n";
        let points = parse_equity_csv(text);
        assert_eq!(
            points,
            vec![
                EquityPoint { timestamp: "t0".into(), equity: 100.0 },
                EquityPoint { timestamp: "t1".into(), equity: 150.0 },
                EquityPoint { timestamp: "t2".into(), equity: 200.0 },
            ]
        );
    }

    #[test]
    fn equity_csv_stray_quote_only_loses_its_row() {
        let text = "timestamp,equity\nt0,100\nt1,\"150\nt2,200\nt3,300\nt4,400\n";
        let stamps: Vec<String> = parse_equity_csv(text).into_iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec!["t0", "t2", "t3", "t4"]);
    }

    #[test]
    fn equity_csv_handles_crlf_short_rows_and_infinities() {
        let text = "timestamp,equity\r\nt0,100\r\nlonely\r\n,50\r\nt1,inf\r\nt2, 101.5 \r\n";
        let points = parse_equity_csv(text);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].timestamp, "t2");
        assert_eq!(points[1].equity, 101.5);
    }

    #[test]
    fn equity_csv_header_only_is_empty() {
        assert!(parse_equity_csv("timestamp,equity\n").is_empty());
        assert!(parse_equity_csv("").is_empty());
    }

    #[test]
    fn close_series_reads_fifth_column() {
        let text = "date,open,high,low,close,volume\n2021-01-01,100,110,90,105,1000\n";
        assert_eq!(parse_close_series(text), vec![105.0]);
    }

    #[test]
    fn close_series_skips_short_and_bad_rows() {
        let text = "date,open,high,low,close,volume\n\
            2021-01-01,100,110,90,105,1000\n\
            2021-01-02,105,115\n\
            2021-01-03,105,115,95,n/a,900\n\
            2021-01-04,106,116,96,111,800\n";
        assert_eq!(parse_close_series(text), vec![105.0, 111.0]);
    }

    #[test]
    fn close_series_stray_quote_only_loses_its_row() {
        let text = "date,open,high,low,close,volume\n\
            d1,1,1,1,10,5\n\
            d2,1,1,1,\"11,5\n\
            d3,1,1,1,12,5\n\
            d4,1,1,1,13,5\n";
        assert_eq!(parse_close_series(text), vec![10.0, 12.0, 13.0]);
    }

    #[tokio::test]
    async fn missing_files_fall_back() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert_eq!(store.get_report().await, Report::default());
        assert_eq!(store.get_config().await, BotConfig::default());
        assert!(store.get_history(200).await.is_empty());
        assert!(store.get_equity_curve(1200).await.is_empty());
        assert!(store.get_price_closes(300).await.is_empty());

        let err = store.load_report().await.unwrap_err();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn malformed_singletons_fall_back() {
        let dir = TempDir::new().unwrap();
        write(&dir, REPORT_FILE, "{ not json");
        write(&dir, CONFIG_FILE, "[1, 2, 3]");
        let store = ArtifactStore::new(dir.path());

        let err = store.load_report().await.unwrap_err();
        assert!(matches!(err, ArtifactError::Malformed { .. }));
        assert!(!err.is_missing());
        assert_eq!(store.get_report().await, Report::default());
        assert_eq!(store.get_config().await, BotConfig::default());
    }

    #[tokio::test]
    async fn reads_report_and_config_from_root() {
        let dir = TempDir::new().unwrap();
        write(&dir, REPORT_FILE, &report_line("20240101T000000Z", 12.34));
        write(&dir, CONFIG_FILE, r#"{"symbol":"ETH/USDT","timeframe":"4h","limit":1000}"#);
        let store = ArtifactStore::new(dir.path());

        let report = store.get_report().await;
        assert_eq!(report.run_id, "20240101T000000Z");
        assert_eq!(report.total_return_pct, 12.34);

        let config = store.get_config().await;
        assert_eq!(config.symbol, "ETH/USDT");
        assert_eq!(config.timeframe, "4h");
        assert_eq!(config.limit, Some(1000));
        assert_eq!(config.model_type, "random_forest");
    }

    #[tokio::test]
    async fn history_is_newest_first_and_capped() {
        let dir = TempDir::new().unwrap();
        let lines: Vec<String> = (0..6).map(|i| report_line(&format!("run{i}"), i as f64)).collect();
        let text = format!("{}\n{{broken\n{}\n", lines[..3].join("\n"), lines[3..].join("\n"));
        write(&dir, HISTORY_FILE, &text);
        let store = ArtifactStore::new(dir.path());

        let all = store.get_history(200).await;
        assert_eq!(ids(&all), vec!["run5", "run4", "run3", "run2", "run1", "run0"]);

        let recent = store.get_history(2).await;
        assert_eq!(ids(&recent), vec!["run5", "run4"]);
    }

    #[tokio::test]
    async fn series_keep_most_recent_points() {
        let dir = TempDir::new().unwrap();
        let equity: String = std::iter::once("timestamp,equity".to_string())
            .chain((0..10).map(|i| format!("t{i},{}", 100 + i)))
            .collect::<Vec<_>>()
            .join("\n");
        write(&dir, EQUITY_FILE, &equity);
        write(
            &dir,
            SAMPLE_DATA_FILE,
            "date,open,high,low,close,volume\nd1,1,1,1,10,5\nd2,1,1,1,11,5\nd3,1,1,1,12,5\n",
        );
        let store = ArtifactStore::new(dir.path());

        let points = store.get_equity_curve(3).await;
        let stamps: Vec<&str> = points.iter().map(|p| p.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["t7", "t8", "t9"]);
        assert_eq!(store.get_equity_curve(1200).await.len(), 10);

        assert_eq!(store.get_price_closes(2).await, vec![11.0, 12.0]);
    }

    #[tokio::test]
    async fn invalid_utf8_only_spoils_its_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(EQUITY_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"timestamp,equity\nt0,100\nt\xff,1\nt2,bad\xfe\nt3,200\n").unwrap();
        let store = ArtifactStore::new(dir.path());

        let points = store.get_equity_curve(1200).await;
        let stamps: Vec<&str> = points.iter().map(|p| p.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["t0", "t\u{FFFD}", "t3"]);
        assert_eq!(points[2].equity, 200.0);
    }

    #[tokio::test]
    async fn partial_report_is_kept_over_the_default() {
        let dir = TempDir::new().unwrap();
        write(&dir, REPORT_FILE, r#"{"final_equity":10500.5,"symbol":"ETH/USDT"}"#);
        let store = ArtifactStore::new(dir.path());

        let report = store.get_report().await;
        assert_eq!(report.final_equity, 10500.5);
        assert_eq!(report.symbol, "ETH/USDT");
        assert_eq!(report.run_id, "");
    }

    #[tokio::test]
    async fn exists_reports_presence() {
        let dir = TempDir::new().unwrap();
        write(&dir, EQUITY_FILE, "timestamp,equity\n");
        let store = ArtifactStore::new(dir.path());

        assert!(store.exists(EQUITY_FILE).await);
        assert!(!store.exists(HISTORY_FILE).await);
        assert_eq!(store.root(), dir.path());
    }
}
