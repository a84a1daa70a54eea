use axum::{extract::State, response::Html};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

use crate::constants::STATUS_WINDOW_HOURS;
use crate::error::Result;
use crate::models::Category;
use crate::AppState;

const CURL_SNIPPET: &str = "curl -X POST https://&lt;your-app&gt;/v1/ingest \
-H 'X-API-Key: &lt;your-key&gt;' -H 'Content-Type: application/json' \
-d '{\"source\":\"bp_timer\",\"category\":\"boss_event\",\"region\":\"NA\",\"payload\":{}}'";

/// Render the status page body
///
/// `counts` is `None` when the database could not be reached.
pub fn render_status(counts: Option<&BTreeMap<Category, i64>>) -> String {
    let health = if counts.is_some() { "✅" } else { "❌" };

    let rows = match counts {
        Some(counts) => {
            let total: i64 = counts.values().sum();
            let mut rows: String = counts
                .iter()
                .map(|(category, count)| format!("<tr><td>{}</td><td>{}</td></tr>", category, count))
                .collect();
            rows.push_str(&format!("<tr><th>Total</th><th>{}</th></tr>", total));
            rows
        }
        None => "<tr><td colspan=\"2\">Database unavailable</td></tr>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>BPSR Crowd Data</title>
    <style>body{{font-family:Arial,sans-serif;margin:2rem}}table{{border-collapse:collapse}}td,th{{border:1px solid #ccc;padding:0.5rem}}</style>
  </head>
  <body>
    <h1>Blue Protocol: Star Resonance Crowd Data</h1>
    <p>API health: <strong>{health}</strong></p>
    <h2>Records in last {hours}h</h2>
    <table>
      <tr><th>Category</th><th>Count</th></tr>
      {rows}
    </table>
    <h2>Submit data</h2>
    <pre>{curl}</pre>
  </body>
</html>
"#,
        health = health,
        hours = STATUS_WINDOW_HOURS,
        rows = rows,
        curl = CURL_SNIPPET,
    )
}

/// HTML status page
///
/// GET /
pub async fn status_page(State(state): State<AppState>) -> Result<Html<String>> {
    if let Err(e) = state.store.ping().await {
        tracing::error!("Status page database check failed: {:?}", e);
        return Ok(Html(render_status(None)));
    }

    let since = Utc::now() - Duration::hours(STATUS_WINDOW_HOURS);

    // Every category is listed, including those with no records
    let mut counts: BTreeMap<Category, i64> = Category::ALL.iter().map(|c| (*c, 0)).collect();
    for (category, count) in state.store.category_counts_since(since).await? {
        counts.insert(category, count);
    }

    Ok(Html(render_status(Some(&counts))))
}
