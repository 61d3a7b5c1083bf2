use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use crate::pipeline::RunSummary;

fn brief_markdown(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    let sources = summary
        .sources
        .iter()
        .map(|s| match &s.error {
            Some(err) => format!("- {}: failed ({})", s.source_id, err),
            None => format!("- {}: {} raw picks", s.source_id, s.raw_picks),
        })
        .collect::<Vec<_>>()
        .join("\n");
    let picks = summary
        .top_picks
        .iter()
        .map(|p| {
            format!(
                "- {} ({}): {} sources, {:.0}% confidence",
                p.adjusted_pick,
                p.sport,
                p.consensus_strength,
                p.confidence_score * 100.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Consensus Picks Run\n\n- Run ID: `{}`\n- Started: {}\n- Finished: {}\n- Raw picks: {}\n- After filtering: {}\n- After scoring: {}\n- New picks: {}\n- Duration: {} ms\n\n## Sources\n{}\n\n## Top New Picks\n{}\n",
        summary.run_id,
        summary.started_at,
        summary.finished_at,
        stats.raw_picks_found,
        stats.after_filtering,
        stats.after_scoring,
        stats.new_picks_added,
        stats.duration_ms,
        if sources.is_empty() { "- none".to_string() } else { sources },
        if picks.is_empty() { "- none".to_string() } else { picks },
    )
}

/// Write `run_summary.json` and `brief.md` under `<reports_dir>/<run_id>/`.
pub async fn write_run_report(reports_dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    let dir = reports_dir.join(summary.run_id.to_string());
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let json = serde_json::to_vec_pretty(summary).context("serializing run summary")?;
    fs::write(dir.join("run_summary.json"), json)
        .await
        .context("writing run_summary.json")?;
    fs::write(dir.join("brief.md"), brief_markdown(summary))
        .await
        .context("writing brief.md")?;
    Ok(dir)
}
