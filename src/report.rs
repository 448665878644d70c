use crate::config::FraudGuardConfig;
use crate::output::{compute_summary, SummaryMetrics};
use crate::session::SessionState;
use crate::simulation::TickMetrics;
use crate::transaction::format_amount;
use std::path::Path;

// ═══════════════════════════════════════════════════════════════════════
// HTML helpers
// ═══════════════════════════════════════════════════════════════════════

fn js_array_u64(data: &[u64]) -> String {
    let items: Vec<String> = data.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(","))
}

fn js_array_opt_f64(data: &[Option<f64>]) -> String {
    let items: Vec<String> = data
        .iter()
        .map(|v| match v {
            Some(x) => format!("{:.4}", x),
            None => "null".to_string(),
        })
        .collect();
    format!("[{}]", items.join(","))
}

fn audit_rows(state: &SessionState) -> String {
    state
        .recent()
        .map(|tx| {
            let class = if tx.is_fraud() { "fraud" } else { "normal" };
            format!(
                "<tr class=\"{class}\"><td>{}</td><td>{}</td><td class=\"num\">{}</td><td>{}</td><td>{}</td></tr>",
                tx.id,
                tx.kind.label(),
                format_amount(tx.amount),
                tx.time_label(),
                tx.status.label(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn alert_panel(state: &SessionState) -> String {
    match state.latest() {
        Some(tx) if tx.is_fraud() => format!(
            r#"<div class="alert fraud"><strong>LATEST FRAUD ALERT</strong><br><code>{}</code> | {}<br><b>Rp {}</b><br>{} &raquo; {} &rarr; {}</div>"#,
            tx.id,
            tx.time_label(),
            format_amount(tx.amount),
            tx.kind.label(),
            tx.sender,
            tx.receiver,
        ),
        _ => r#"<div class="alert clear">No suspicious activity</div>"#.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Main report generation
// ═══════════════════════════════════════════════════════════════════════

/// Render a self-contained HTML dashboard snapshot.
///
/// The pie chart uses the session counters; the line chart and summary cards
/// use the per-tick metrics, so they are empty when metrics were not recorded.
pub fn generate_report(
    state: &SessionState,
    metrics: &[TickMetrics],
    config: &FraudGuardConfig,
    user: &str,
) -> String {
    let summary: SummaryMetrics = compute_summary(metrics);

    let ticks: Vec<u64> = metrics.iter().map(|m| m.tick).collect();
    let fraud_series: Vec<u64> = metrics.iter().map(|m| m.fraud_count).collect();
    let normal_series: Vec<u64> = metrics.iter().map(|m| m.normal_count).collect();
    let scores: Vec<Option<f64>> = metrics.iter().map(|m| m.score).collect();

    let params = &config.params;
    let detector = &config.detector;

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>FraudGuard Pro | {user}</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
<style>
*{{margin:0;padding:0;box-sizing:border-box}}
body{{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:#f5f5f5;color:#333}}
header{{background:#1a1a2e;color:#fff;padding:24px 32px}}
header h1{{font-size:1.4em;font-weight:500}}
header h2{{font-size:1.0em;font-weight:300;opacity:0.8}}
main{{max-width:1400px;margin:0 auto;padding:24px}}
section{{background:#fff;border-radius:8px;box-shadow:0 1px 3px rgba(0,0,0,0.1);padding:24px;margin-bottom:20px}}
section h3{{font-size:1.1em;margin-bottom:16px;color:#1a1a2e;border-bottom:2px solid #e0e0e0;padding-bottom:8px}}
.metrics-grid{{display:grid;grid-template-columns:repeat(auto-fill,minmax(180px,1fr));gap:12px}}
.metric{{background:#f8f9fa;border-radius:6px;padding:12px;text-align:center}}
.metric .label{{display:block;font-size:0.75em;color:#666;text-transform:uppercase;letter-spacing:0.5px}}
.metric .value{{display:block;font-size:1.3em;font-weight:600;margin-top:4px}}
.chart-row{{display:grid;grid-template-columns:1fr 2fr;gap:20px;margin-bottom:20px}}
@media(max-width:900px){{.chart-row{{grid-template-columns:1fr}}}}
.chart-box{{background:#fff;border-radius:8px;box-shadow:0 1px 3px rgba(0,0,0,0.1);padding:16px}}
.chart-box h4{{font-size:0.95em;margin-bottom:8px;color:#555}}
canvas{{width:100%!important;height:300px!important}}
.alert{{padding:16px;border-radius:6px;margin-bottom:12px;line-height:1.6}}
.alert.fraud{{background:#fdecea;color:#b3261e}}
.alert.clear{{background:#e6f4ea;color:#137333}}
.table-wrap{{max-height:420px;overflow-y:auto}}
table{{width:100%;border-collapse:collapse;font-size:0.9em}}
th,td{{padding:8px 12px;text-align:left;border-bottom:1px solid #e0e0e0}}
th{{background:#f8f9fa;font-weight:600;position:sticky;top:0}}
td.num{{text-align:right;font-variant-numeric:tabular-nums}}
tr.fraud td{{color:#b3261e;font-weight:600}}
footer{{text-align:center;padding:16px;color:#999;font-size:0.8em}}
</style>
</head>
<body>
<header>
 <h1>FraudGuard Pro</h1>
 <h2>Logged in as {user_upper}</h2>
</header>
<main>

<section>
<h3>Summary</h3>
<div class="metrics-grid">
 <div class="metric"><span class="label">Transactions</span><span class="value">{total}</span></div>
 <div class="metric"><span class="label">Fraud Detected</span><span class="value">{fraud}</span></div>
 <div class="metric"><span class="label">Normal</span><span class="value">{normal}</span></div>
 <div class="metric"><span class="label">Model Consulted</span><span class="value">{consulted}</span></div>
 <div class="metric"><span class="label">Injected</span><span class="value">{injected}</span></div>
 <div class="metric"><span class="label">Detection Rate</span><span class="value">{detection:.1}%</span></div>
 <div class="metric"><span class="label">Precision</span><span class="value">{precision:.1}%</span></div>
</div>
</section>

<section>
<h3>Parameters</h3>
<table>
<tr><th>Parameter</th><th>Value</th></tr>
<tr><td>Transactions / second</td><td>{speed}</td></tr>
<tr><td>Injected fraud rate</td><td>{fraud_rate}%</td></tr>
<tr><td>Detector sensitivity</td><td>{sensitivity:.2}</td></tr>
<tr><td>Trees</td><td>{n_estimators}</td></tr>
<tr><td>Contamination</td><td>{contamination:.2}</td></tr>
<tr><td>Decision threshold</td><td>{threshold:.2}</td></tr>
<tr><td>Training set</td><td>{training_set}</td></tr>
<tr><td>Seed</td><td>{seed}</td></tr>
</table>
</section>

<section>
<h3>Live Alerts</h3>
{alert}
<div class="metric"><span class="label">Total Fraud Detected</span><span class="value">{session_fraud}</span></div>
</section>

<div class="chart-row">
 <div class="chart-box"><h4>Transaction Distribution</h4><canvas id="c1"></canvas></div>
 <div class="chart-box"><h4>Cumulative Counts</h4><canvas id="c2"></canvas></div>
</div>
<div class="chart-row">
 <div class="chart-box"><h4>Decision Threshold</h4><p>Scores below {threshold:.2} are flagged.</p></div>
 <div class="chart-box"><h4>Anomaly Scores</h4><canvas id="c3"></canvas></div>
</div>

<section>
<h3>Audit Trail</h3>
<div class="table-wrap">
<table>
<tr><th>ID</th><th>Type</th><th>Amount</th><th>Time</th><th>Status</th></tr>
{rows}
</table>
</div>
</section>

</main>
<footer>Generated by fraudguard</footer>

<script>
const T={js_ticks};
const D={{
 fraud:{js_fraud},
 normal:{js_normal},
 score:{js_scores}
}};
const lineOpts=(title,yLabel)=>({{responsive:true,maintainAspectRatio:false,plugins:{{title:{{display:true,text:title}},legend:{{position:'bottom'}}}},scales:{{x:{{title:{{display:true,text:'Tick'}},ticks:{{maxTicksLimit:10}}}},y:{{title:{{display:true,text:yLabel}}}}}}}});

// 1. Distribution
new Chart(document.getElementById('c1'),{{type:'pie',data:{{labels:['Normal','Fraud'],datasets:[{{data:[{session_normal},{session_fraud}],backgroundColor:['green','red']}}]}},options:{{responsive:true,maintainAspectRatio:false}}}});

// 2. Cumulative counts
new Chart(document.getElementById('c2'),{{type:'line',data:{{labels:T,datasets:[
 {{label:'Normal',data:D.normal,borderColor:'green',pointRadius:0,fill:false}},
 {{label:'Fraud',data:D.fraud,borderColor:'red',pointRadius:0,fill:false}}
]}},options:lineOpts('Cumulative Counts','Transactions')}});

// 3. Scores
new Chart(document.getElementById('c3'),{{type:'scatter',data:{{datasets:[
 {{label:'Decision score',data:D.score.map((s,i)=>s===null?null:{{x:T[i],y:s}}).filter(p=>p),backgroundColor:'#4285f4',pointRadius:2}},
 {{label:'Threshold',type:'line',data:[{{x:T[0]||0,y:{threshold}}},{{x:T[T.length-1]||0,y:{threshold}}}],borderColor:'#ea4335',borderDash:[6,3],pointRadius:0}}
]}},options:lineOpts('Anomaly Scores','Decision score')}});
</script>
</body>
</html>
"#,
        user = user,
        user_upper = user.to_uppercase(),
        total = summary.total_ticks,
        fraud = summary.fraud_count,
        normal = summary.normal_count,
        consulted = summary.consulted_count,
        injected = summary.injected_count,
        detection = summary.detection_rate * 100.0,
        precision = summary.precision * 100.0,
        speed = params.speed,
        fraud_rate = params.fraud_rate,
        sensitivity = params.sensitivity,
        n_estimators = detector.n_estimators,
        contamination = detector.contamination,
        threshold = detector.threshold,
        training_set = detector.training_set.name(),
        seed = config.seed,
        alert = alert_panel(state),
        session_fraud = state.fraud_count,
        session_normal = state.normal_count,
        rows = audit_rows(state),
        js_ticks = js_array_u64(&ticks),
        js_fraud = js_array_u64(&fraud_series),
        js_normal = js_array_u64(&normal_series),
        js_scores = js_array_opt_f64(&scores),
    )
}

/// Save an HTML report to disk.
pub fn save_report(html: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_arrays() {
        assert_eq!(js_array_u64(&[1, 2, 3]), "[1,2,3]");
        assert_eq!(js_array_opt_f64(&[Some(-0.12345), None]), "[-0.1235,null]");
        assert_eq!(js_array_u64(&[]), "[]");
    }

    #[test]
    fn test_empty_report_renders() {
        let state = SessionState::default();
        let html = generate_report(&state, &[], &FraudGuardConfig::default(), "admin");
        assert!(html.contains("Logged in as ADMIN"));
        assert!(html.contains("No suspicious activity"));
        assert!(html.contains("type:'pie'"));
    }
}
