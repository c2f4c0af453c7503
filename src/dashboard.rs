use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::Method,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::Settings,
    store::{ArtifactStore, ARTIFACTS},
    utils::now_ts,
    view::{DashboardView, EMPTY_HISTORY_HINT},
};

pub const API_EQUITY_CAP: usize = 1200;
pub const API_HISTORY_CAP: usize = 200;

#[derive(Clone)]
pub struct DashboardState {
    pub settings: Settings,
    pub store: ArtifactStore,
}

pub fn router(state: DashboardState) -> Router {
    let api = Router::new()
        .route("/api/config", get(api_config))
        .route("/api/equity", get(api_equity))
        .route("/api/history", get(api_history))
        .route("/api/report", get(api_report))
        .route("/api/health", get(api_health))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET])
                .allow_origin(Any),
        );

    Router::new()
        .route("/", get(index))
        .merge(api)
        .with_state(state)
}

pub async fn serve_dashboard(settings: Settings, store: ArtifactStore) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.dashboard_host, settings.dashboard_port)
        .parse()
        .with_context(|| {
            format!(
                "dashboard addr parse {}:{}",
                settings.dashboard_host, settings.dashboard_port
            )
        })?;

    let app = router(DashboardState {
        settings: settings.clone(),
        store,
    });

    log::info!("dashboard.start url=http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("dashboard.stop");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("dashboard.signal_error {}", e);
    }
}

async fn index(State(st): State<DashboardState>) -> impl IntoResponse {
    let view = DashboardView::load(&st.store).await;
    Html(render_index_html(&view))
}

async fn api_config(State(st): State<DashboardState>) -> impl IntoResponse {
    Json(st.store.get_config().await)
}

async fn api_equity(State(st): State<DashboardState>) -> impl IntoResponse {
    Json(st.store.get_equity_curve(API_EQUITY_CAP).await)
}

async fn api_history(State(st): State<DashboardState>) -> impl IntoResponse {
    Json(st.store.get_history(API_HISTORY_CAP).await)
}

async fn api_report(State(st): State<DashboardState>) -> impl IntoResponse {
    Json(st.store.get_report().await)
}

async fn api_health(State(st): State<DashboardState>) -> impl IntoResponse {
    let mut artifacts = serde_json::Map::new();
    for (name, relative) in ARTIFACTS {
        artifacts.insert(name.to_string(), st.store.exists(relative).await.into());
    }
    Json(serde_json::json!({
        "ts": now_ts(),
        "root": st.store.root().display().to_string(),
        "url": st.settings.dashboard_url(),
        "artifacts": artifacts,
    }))
}

pub fn render_index_html(view: &DashboardView) -> String {
    let snapshot = view
        .snapshot
        .iter()
        .enumerate()
        .map(|(i, card)| {
            let class = if i == 0 { "kpi hero" } else { "kpi" };
            format!(
                r#"<div class="{class}"><div class="lbl">{}</div><div class="val {}">{}</div></div>"#,
                card.label,
                card.tone.css_class(),
                card.value
            )
        })
        .collect::<String>();

    let metrics = view
        .metrics
        .iter()
        .map(|card| {
            format!(
                r#"<article class="card kpi col-3"><div class="lbl">{}</div><div class="val">{}</div></article>"#,
                card.label, card.value
            )
        })
        .collect::<String>();

    let control_rows = view
        .control_panel
        .iter()
        .map(|(k, v)| format!(r#"<div class="kv"><dt>{k}</dt><dd>{v}</dd></div>"#))
        .collect::<String>();

    let history_rows = if view.recent_runs.is_empty() {
        format!(r#"<tr><td class="small" colspan="6">{EMPTY_HISTORY_HINT}</td></tr>"#)
    } else {
        view.recent_runs
            .iter()
            .map(|run| {
                format!(
                    r#"<tr><td class="mono"><b>{}</b></td><td class="small">{}</td><td class="{}"><b>{}</b></td><td class="small">{}</td><td class="small">{}</td><td class="small">{}</td></tr>"#,
                    run.run_id,
                    run.created_at,
                    run.return_tone.css_class(),
                    run.total_return,
                    run.max_drawdown,
                    run.sharpe,
                    run.closed_trades
                )
            })
            .collect::<String>()
    };

    format!(
        r##"<!doctype html>
 <html lang="en">
   <head>
     <meta charset="utf-8" />
     <meta name="viewport" content="width=device-width, initial-scale=1" />
     <title>Crypto Self-Learning Bot</title>
     <meta name="description" content="Dashboard for the self-learning crypto backtest pipeline." />
     <style>
       :root {{
         --bg: #0b1220;
         --panel: rgba(255,255,255,0.06);
         --stroke: rgba(255,255,255,0.12);
         --text: rgba(255,255,255,0.92);
         --muted: rgba(255,255,255,0.65);
         --good: #33d17a;
         --bad: #ff4d4d;
         --brand: #10b981;
         --brand2: #f59e0b;
       }}
       * {{ box-sizing: border-box; }}
       body {{
         margin: 0;
         font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial;
         color: var(--text);
         background: radial-gradient(1200px 900px at 10% 10%, rgba(16,185,129,0.15), transparent 40%),
                     radial-gradient(1100px 800px at 90% 20%, rgba(245,158,11,0.14), transparent 45%),
                     var(--bg);
       }}
       .wrap {{ max-width: 1280px; margin: 0 auto; padding: 22px 18px 42px; }}
       .topbar {{
         display: flex; align-items: center; justify-content: space-between; gap: 12px;
         padding: 16px 16px; border: 1px solid var(--stroke); border-radius: 16px;
         background: linear-gradient(180deg, rgba(255,255,255,0.06), rgba(255,255,255,0.03));
       }}
       .brand {{ display: flex; align-items: center; gap: 12px; }}
       .logo {{
         width: 42px; height: 42px; border-radius: 12px; display: grid; place-items: center;
         background: conic-gradient(from 180deg, var(--brand), var(--brand2), var(--brand));
         font-weight: 800; color: #0b1220;
       }}
       .title {{ font-weight: 800; letter-spacing: 0.2px; }}
       .subtitle {{ color: var(--muted); font-size: 12px; margin-top: 2px; text-transform: uppercase; letter-spacing: 0.2em; }}
       .chips {{ display: flex; flex-wrap: wrap; gap: 8px; justify-content: flex-end; }}
       .chip {{
         padding: 7px 10px; border-radius: 999px; border: 1px solid var(--stroke);
         background: rgba(255,255,255,0.04); font-size: 12px; color: var(--muted); white-space: nowrap;
       }}
       .chip b {{ color: var(--text); }}
       .chip.ready {{ color: var(--good); border-color: rgba(51,209,122,0.4); }}
       .grid {{ display: grid; gap: 14px; margin-top: 14px; grid-template-columns: repeat(12, 1fr); }}
       .card {{ border: 1px solid var(--stroke); border-radius: 16px; background: var(--panel); overflow: hidden; }}
       .card .hd {{
         display:flex; align-items: flex-end; justify-content: space-between; gap: 10px;
         padding: 12px 14px; border-bottom: 1px solid rgba(255,255,255,0.08); background: rgba(255,255,255,0.03);
       }}
       .card .hd .h {{ font-weight: 800; letter-spacing: 0.2px; }}
       .eyebrow {{ color: var(--muted); font-size: 11px; text-transform: uppercase; letter-spacing: 0.2em; }}
       .pill {{ font-size: 12px; color: var(--muted); border: 1px solid var(--stroke); padding: 3px 8px; border-radius: 999px; }}
       .card .bd {{ padding: 12px 14px; }}
       .kpis {{ display: grid; gap: 10px; grid-template-columns: repeat(4, 1fr); }}
       .kpi {{ border: 1px solid rgba(255,255,255,0.10); border-radius: 14px; padding: 12px 12px; background: rgba(255,255,255,0.04); }}
       .kpi.hero {{ background: linear-gradient(135deg, rgba(16,185,129,0.25), rgba(245,158,11,0.18)); }}
       .kpi .lbl {{ color: var(--muted); font-size: 12px; text-transform: uppercase; letter-spacing: 0.16em; }}
       .kpi .val {{ font-size: 22px; font-weight: 850; margin-top: 6px; letter-spacing: -0.3px; }}
       .good {{ color: var(--good); }}
       .bad {{ color: var(--bad); }}
       .chart {{ border-radius: 12px; background: rgba(255,255,255,0.03); padding: 10px; }}
       .chart svg {{ width: 100%; height: auto; display: block; }}
       dl {{ margin: 0; }}
       .kv {{ display: flex; justify-content: space-between; padding: 8px 0; border-bottom: 1px solid rgba(255,255,255,0.07); font-size: 13px; }}
       .kv dt {{ color: var(--muted); }}
       .kv dd {{ margin: 0; font-weight: 700; }}
       table {{ width: 100%; border-collapse: collapse; }}
       th, td {{ padding: 10px 10px; border-bottom: 1px solid rgba(255,255,255,0.07); text-align: left; }}
       th {{ color: var(--muted); font-size: 12px; font-weight: 700; text-transform: uppercase; letter-spacing: 0.12em; }}
       td {{ font-size: 13px; }}
       .small {{ font-size: 12px; color: var(--muted); }}
       .mono {{ font-family: ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, "Liberation Mono", "Courier New", monospace; }}
       .col-12 {{ grid-column: span 12; }}
       .col-8 {{ grid-column: span 8; }}
       .col-4 {{ grid-column: span 4; }}
       .col-3 {{ grid-column: span 3; }}
       @media (max-width: 1100px) {{
         .kpis {{ grid-template-columns: repeat(2, 1fr); }}
         .col-8, .col-4 {{ grid-column: span 12; }}
         .col-3 {{ grid-column: span 6; }}
       }}
     </style>
   </head>
   <body>
     <main class="wrap">
       <header class="topbar">
         <div class="brand">
           <div class="logo">SL</div>
           <div>
             <div class="subtitle">alpha control room</div>
             <div class="title">Crypto Self-Learning Bot</div>
           </div>
         </div>
         <div class="chips">
           <div class="chip"><b>{symbol}</b></div>
           <div class="chip"><b>{timeframe}</b></div>
           <div class="chip ready">backtest ready</div>
         </div>
       </header>

       <div class="grid">
         <section class="card col-12">
           <div class="hd"><div class="h">Latest snapshot</div><a class="pill" href="#history">Run History</a></div>
           <div class="bd">
             <div class="kpis">{snapshot}</div>
             <div class="small" style="margin-top:10px;">Last equity timestamp: <span class="mono">{latest_timestamp}</span></div>
           </div>
         </section>
       </div>

       <div class="grid" id="performance">
         {metrics}

         <section class="card col-8">
           <div class="hd">
             <div><div class="eyebrow">Equity Curve</div><div class="h">Portfolio growth trace</div></div>
             <div class="pill">{equity_points} points</div>
           </div>
           <div class="bd chart">
             <svg viewBox="0 0 {equity_w} {equity_h}" preserveAspectRatio="none">
               <defs>
                 <linearGradient id="equity" x1="0" x2="1">
                   <stop offset="0%" stop-color="#94a3b8" />
                   <stop offset="55%" stop-color="#10b981" />
                   <stop offset="100%" stop-color="#f59e0b" />
                 </linearGradient>
               </defs>
               <path d="{equity_path}" fill="none" stroke="url(#equity)" stroke-width="3.5" stroke-linecap="round" />
             </svg>
           </div>
         </section>

         <aside class="card col-4">
           <div class="hd"><div><div class="eyebrow">Model + Risk</div><div class="h">Control panel</div></div></div>
           <div class="bd"><dl>{control_rows}</dl></div>
         </aside>

         <section class="card col-12">
           <div class="hd">
             <div><div class="eyebrow">Market context</div><div class="h">Sample close-price snapshot</div></div>
             <div class="pill">{close_count} closes</div>
           </div>
           <div class="bd chart">
             <svg viewBox="0 0 {close_w} {close_h}" preserveAspectRatio="none">
               <path d="{close_path}" fill="none" stroke="#cbd5e1" stroke-width="2.5" stroke-linecap="round" />
             </svg>
           </div>
         </section>
       </div>

       <div class="grid" id="history">
         <section class="card col-12">
           <div class="hd">
             <div><div class="eyebrow">Run archive</div><div class="h">Recent backtests</div></div>
             <div class="pill">{stored_runs} stored runs</div>
           </div>
           <div class="bd">
             <table>
               <thead>
                 <tr>
                   <th>Run</th>
                   <th>Date (UTC)</th>
                   <th>Return</th>
                   <th>MDD</th>
                   <th>Sharpe</th>
                   <th>Trades</th>
                 </tr>
               </thead>
               <tbody>{history_rows}</tbody>
             </table>
           </div>
         </section>
       </div>
     </main>
   </body>
 </html>"##,
        symbol = view.symbol,
        timeframe = view.timeframe,
        snapshot = snapshot,
        latest_timestamp = view.latest_timestamp,
        metrics = metrics,
        equity_points = view.equity_points,
        equity_w = crate::view::EQUITY_CHART.width,
        equity_h = crate::view::EQUITY_CHART.height,
        equity_path = view.equity_path,
        control_rows = control_rows,
        close_count = view.close_count,
        close_w = crate::view::CLOSE_CHART.width,
        close_h = crate::view::CLOSE_CHART.height,
        close_path = view.close_path,
        stored_runs = view.stored_runs,
        history_rows = history_rows,
    )
}
