use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use heatclip::config::{Config, ConfigBuilder};
use heatclip::page::{parse_video_id, SnapshotFetcher};
use heatclip::processing::BatchProcessor;

fn cli() -> Command {
    Command::new("Heatclip")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Cut clips where a video's replay heatmap rises above its mean")
        .arg(
            Arg::new("videos")
                .long("videos")
                .value_name("IDS")
                .help("Comma-separated video IDs or watch URLs"),
        )
        .arg(
            Arg::new("video-file")
                .long("video-file")
                .value_name("FILE")
                .help("File with one video ID or URL per line"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: search heatclip.toml)"),
        )
        .arg(
            Arg::new("snapshot-dir")
                .short('p')
                .long("snapshot-dir")
                .value_name("DIR")
                .help("Directory of saved pages named {video_id}.html"),
        )
        .arg(
            Arg::new("source-dir")
                .short('s')
                .long("source-dir")
                .value_name("DIR")
                .help("Directory of downloaded source videos"),
        )
        .arg(
            Arg::new("transcript-dir")
                .short('t')
                .long("transcript-dir")
                .value_name("DIR")
                .help("Directory of {video_id}.{lang}.srt/.json transcripts"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for clips and results"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize))
                .help("Number of videos processed in parallel"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .value_name("RATIO")
                .value_parser(clap::value_parser!(f64))
                .help("Deviation from mean attention that marks a rise or fall"),
        )
        .arg(
            Arg::new("no-cut")
                .long("no-cut")
                .help("Analyze only, do not cut clips")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("http")
                .long("http")
                .help("Fetch pages over HTTP instead of reading snapshots")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
}

/// IDs from `--videos` and `--video-file`, in order, without duplicates
async fn collect_video_ids(matches: &clap::ArgMatches) -> Result<Vec<String>> {
    let mut inputs: Vec<String> = Vec::new();

    if let Some(videos) = matches.get_one::<String>("videos") {
        inputs.extend(videos.split(',').map(str::to_string));
    }

    if let Some(file) = matches.get_one::<String>("video-file") {
        let content = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("failed to read video list {}", file))?;
        inputs.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    let mut ids: Vec<String> = Vec::new();
    for input in inputs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        match parse_video_id(input) {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => warn!("⚠️ Skipping unrecognized video reference: {}", input),
        }
    }
    Ok(ids)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let loaded = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(&PathBuf::from(path)).map(|mut config| {
            config.apply_env();
            config
        }),
        None => Config::load(),
    };

    let log_level = match (&loaded, verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.output.log_level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("heatclip={},warn", log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = loaded.unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    let mut builder = ConfigBuilder::from_config(config);
    if let Some(dir) = matches.get_one::<String>("snapshot-dir") {
        builder = builder.with_snapshot_dir(PathBuf::from(dir));
    }
    if let Some(dir) = matches.get_one::<String>("source-dir") {
        builder = builder.with_source_dir(PathBuf::from(dir));
    }
    if let Some(dir) = matches.get_one::<String>("transcript-dir") {
        builder = builder.with_transcript_dir(PathBuf::from(dir));
    }
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        builder = builder.with_output_dir(PathBuf::from(dir));
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        builder = builder.with_workers(*workers);
    }
    if let Some(threshold) = matches.get_one::<f64>("threshold") {
        builder = builder.with_threshold(*threshold);
    }
    if matches.get_flag("no-cut") {
        builder = builder.enable_clips(false);
    }
    if matches.get_flag("http") {
        builder = builder.use_http(true);
    }
    let config = builder.build();
    config.validate()?;

    info!("🚀 Heatclip starting...");
    for line in config.summary().lines() {
        info!("{}", line);
    }

    let mut video_ids = collect_video_ids(&matches).await?;
    if video_ids.is_empty() && !config.page.use_http {
        video_ids = SnapshotFetcher::new(config.page.snapshot_dir.clone()).discover();
        info!("🔍 Discovered {} saved pages", video_ids.len());
    }
    if video_ids.is_empty() {
        error!("No videos given and no saved pages found");
        return Err(anyhow!("nothing to process: pass --videos, --video-file or --snapshot-dir"));
    }

    let workers = config.performance.max_workers;
    let processor = BatchProcessor::new(config, workers);
    let results = processor.process_videos(video_ids).await?;

    info!("🎉 Processing completed in {:.2}s", results.total_time.as_secs_f64());
    info!("✅ Succeeded: {}", results.succeeded);
    info!("🕳️ No heatmap: {}", results.no_heatmap);
    info!("⏳ Timed out: {}", results.timed_out);
    info!("🧩 Malformed: {}", results.malformed);
    info!("❌ Failed: {}", results.failed);
    info!("✂️ Clips cut: {}", results.clips_cut);

    Ok(())
}
