//! Reporting and export: JSON, CSV, and plain-text artifact generation.
//!
//! Provides the export formats for simulation results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-candidate accuracy table and the long-format roster list
//! - **Text**: tolerance report listing the candidates beyond tolerance
//!
//! Persisted manifests carry a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rosterlab_core::{AccuracyReport, CandidatePool, RosterCollection};

use crate::replicates::ReplicateSummary;
use crate::runner::{SimulationResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `SimulationResult` to pretty JSON.
pub fn export_json(result: &SimulationResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize SimulationResult to JSON")
}

/// Deserialize a `SimulationResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<SimulationResult> {
    let result: SimulationResult =
        serde_json::from_str(json).context("failed to deserialize SimulationResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the accuracy table as CSV, one row per candidate in id order.
///
/// Columns: match_code, player_code, player_name, role, team, perc_selection,
/// expected_team_count, actual_team_count, actual_perc_selection, perc_error,
/// within_tolerance. Percent columns are scaled by 100 and rounded to 2 places.
pub fn export_accuracy_csv(report: &AccuracyReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "match_code",
        "player_code",
        "player_name",
        "role",
        "team",
        "perc_selection",
        "expected_team_count",
        "actual_team_count",
        "actual_perc_selection",
        "perc_error",
        "within_tolerance",
    ])?;

    for r in &report.records {
        wtr.write_record([
            r.match_code.as_deref().unwrap_or(""),
            r.candidate_id.as_str(),
            &r.name,
            r.role.as_str(),
            &r.team,
            &format!("{:.2}", r.target_frequency * 100.0),
            &r.expected_count.to_string(),
            &r.observed_count.to_string(),
            &format!("{:.2}", r.observed_frequency * 100.0),
            &format!("{:.2}", r.relative_error * 100.0),
            &r.within_tolerance.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the roster collection in long format: one row per (roster, member).
///
/// Columns: roster_id, match_code, player_code, player_name, role, team,
/// perc_selection. Fails if a roster references a candidate not in `pool`.
pub fn export_rosters_csv(pool: &CandidatePool, collection: &RosterCollection) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "roster_id",
        "match_code",
        "player_code",
        "player_name",
        "role",
        "team",
        "perc_selection",
    ])?;

    for (roster_id, roster) in collection.iter().enumerate() {
        for id in roster.members() {
            let Some(c) = pool.get(id) else {
                bail!("roster {roster_id} references unknown candidate '{id}'");
            };
            wtr.write_record([
                &roster_id.to_string(),
                c.match_code().unwrap_or(""),
                id.as_str(),
                c.name(),
                c.role().as_str(),
                c.team(),
                &c.target_probability().to_string(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export replicate stability statistics, one row per candidate.
pub fn export_replicates_csv(summary: &ReplicateSummary) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "player_code",
        "player_name",
        "role",
        "perc_selection",
        "mean_perc_error",
        "std_perc_error",
        "within_fraction",
    ])?;
    for c in &summary.candidates {
        wtr.write_record([
            c.candidate_id.as_str(),
            &c.name,
            c.role.as_str(),
            &format!("{:.2}", c.target_frequency * 100.0),
            &format!("{:.2}", c.mean_relative_error * 100.0),
            &format!("{:.2}", c.std_relative_error * 100.0),
            &format!("{:.3}", c.within_fraction),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Text report ────────────────────────────────────────────────────

/// Human-readable tolerance report.
pub fn render_tolerance_report(report: &AccuracyReport) -> String {
    let pct = report.tolerance * 100.0;
    let mut out = String::new();
    out.push_str(&format!(
        "Candidates within ±{pct:.2}% error: {} out of {}\n",
        report.within_count,
        report.records.len()
    ));
    out.push_str(&format!("Unique rosters: {}\n", report.collection_size));
    out.push_str(&format!(
        "Error range: {:.2}% to {:.2}%\n\n",
        report.min_error * 100.0,
        report.max_error * 100.0
    ));

    if report.all_within() {
        out.push_str(&format!(
            "All candidates are within the ±{pct:.2}% error threshold.\n"
        ));
    } else {
        out.push_str(&format!("Candidates exceeding ±{pct:.2}% error threshold:\n"));
        for r in report.outside() {
            out.push_str(&format!(
                " - {} (Code: {}, Error: {:.4})\n",
                r.name, r.candidate_id, r.relative_error
            ));
        }
    }
    out
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single simulation.
///
/// Creates a directory named `{label}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `SimulationResult`
/// - `accuracy.csv`: per-candidate accuracy table
/// - `rosters.csv`: long-format roster list
/// - `report.txt`: tolerance report
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    result: &SimulationResult,
    pool: &CandidatePool,
    output_dir: &Path,
) -> Result<PathBuf> {
    let run_dir = create_run_dir(output_dir, &result.label)?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("accuracy.csv"),
        export_accuracy_csv(&result.accuracy)?,
    )?;
    std::fs::write(
        run_dir.join("rosters.csv"),
        export_rosters_csv(pool, &result.rosters)?,
    )?;
    std::fs::write(
        run_dir.join("report.txt"),
        render_tolerance_report(&result.accuracy),
    )?;

    Ok(run_dir)
}

/// Save replicate results: `replicates.json` and `stability.csv`.
pub fn save_replicate_artifacts(
    summary: &ReplicateSummary,
    label: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let run_dir = create_run_dir(output_dir, &format!("{label}_replicates"))?;
    let json = serde_json::to_string_pretty(summary)
        .context("failed to serialize ReplicateSummary to JSON")?;
    std::fs::write(run_dir.join("replicates.json"), json)?;
    std::fs::write(run_dir.join("stability.csv"), export_replicates_csv(summary)?)?;
    Ok(run_dir)
}

fn create_run_dir(output_dir: &Path, label: &str) -> Result<PathBuf> {
    let dirname = format!("{}_{}", label, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;
    Ok(run_dir)
}
