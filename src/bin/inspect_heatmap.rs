use anyhow::{anyhow, Context, Result};
use clap::{Arg, Command};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use heatclip::clips::clip_requests;
use heatclip::config::HeatmapConfig;
use heatclip::page::extract_duration;
use heatclip::processing::analyze_markup;
use heatclip::transcript::parse_srt;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter("heatclip=info,warn")
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("inspect-heatmap")
        .about("Analyze one saved page and print the detected intervals as JSON")
        .arg(
            Arg::new("page")
                .value_name("FILE")
                .help("Saved page markup ({video_id}.html)")
                .required(true),
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(f64))
                .help("Video duration, if the page does not carry it"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .value_name("RATIO")
                .value_parser(clap::value_parser!(f64))
                .help("Deviation from mean attention that marks a rise or fall"),
        )
        .arg(
            Arg::new("srt")
                .long("srt")
                .value_name("FILE")
                .help("Subtitle file to map onto the intervals"),
        )
        .get_matches();

    let page_path = matches
        .get_one::<String>("page")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("page file is required"))?;
    let markup = tokio::fs::read_to_string(&page_path)
        .await
        .with_context(|| format!("failed to read {}", page_path.display()))?;

    let duration = matches
        .get_one::<f64>("duration")
        .copied()
        .or_else(|| extract_duration(&markup))
        .ok_or_else(|| anyhow!("{} carries no duration, pass --duration", page_path.display()))?;

    let mut heatmap = HeatmapConfig::default();
    if let Some(threshold) = matches.get_one::<f64>("threshold") {
        heatmap.threshold = *threshold;
    }

    let transcript = match matches.get_one::<String>("srt") {
        Some(path) => Some(parse_srt(&tokio::fs::read_to_string(path).await?)?),
        None => None,
    };

    let video_id = page_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    info!("🔍 Inspecting {} ({:.1}s)", page_path.display(), duration);
    let analyzed = analyze_markup(&markup, duration, transcript.as_deref(), &heatmap)?;
    let requests = clip_requests(&video_id, &analyzed.analysis, &analyzed.sections);

    let report = json!({
        "video_id": video_id,
        "duration_seconds": duration,
        "sample_count": analyzed.sample_count,
        "analysis": analyzed.analysis,
        "clips": requests,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
