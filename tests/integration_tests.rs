use heatclip::clips::clip_requests;
use heatclip::config::{Config, ConfigBuilder};
use heatclip::error::{HeatmapError, VideoStatus};
use heatclip::heatmap::{analyze, extract_fragments, sample, stitch, SamplerConfig, DEFAULT_THRESHOLD};
use heatclip::page::{PageFetcher, SnapshotFetcher};
use heatclip::processing::BatchProcessor;
use heatclip::transcript::{map_intervals, ProviderChain, SrtFileProvider};
use std::path::Path;
use tempfile::TempDir;
use tokio::fs;

/// Two chapters: flat, climbing to a peak, then dropping back
fn two_chapter_page(duration: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><meta itemprop="duration" content="{}"></head><body>
<div class="ytp-progress-bar-container">
  <div class="ytp-heat-map-container">
    <div class="ytp-heat-map-chapter" style="width: 500px">
      <svg class="ytp-heat-map-svg" width="500px" height="40px" viewBox="0 0 1000 100">
        <defs><clipPath id="c1"><path d="M 0,900 C 100,900 200,900 300,100"></path></clipPath></defs>
        <rect class="ytp-heat-map-graph" clip-path="url(#c1)"></rect>
      </svg>
    </div>
    <div class="ytp-heat-map-chapter" style="width: 500px">
      <svg class="ytp-heat-map-svg" width="500px" height="40px" viewBox="0 0 1000 100">
        <defs><clipPath id="c2"><path d="M 400,100 C 500,900 600,900 700,900"></path></clipPath></defs>
        <rect class="ytp-heat-map-graph" clip-path="url(#c2)"></rect>
      </svg>
    </div>
  </div>
</div></body></html>"#,
        duration
    )
}

const SUBTITLES: &str = "1
00:00:29,000 --> 00:00:31,000
before

2
00:00:35,000 --> 00:00:37,500
peak one

3
00:00:40,000 --> 00:00:42,000
peak two

4
00:00:45,000 --> 00:00:47,000
after
";

async fn write_fixture(root: &Path) {
    fs::create_dir_all(root.join("pages")).await.unwrap();
    fs::create_dir_all(root.join("transcripts")).await.unwrap();
    fs::write(root.join("pages/vidA.html"), two_chapter_page("PT1M40S")).await.unwrap();
    fs::write(root.join("pages/vidB.html"), "<html><body>no heatmap here</body></html>")
        .await
        .unwrap();
    fs::write(root.join("transcripts/vidA.en.srt"), SUBTITLES).await.unwrap();
}

fn config_for(root: &Path) -> Config {
    ConfigBuilder::new()
        .with_snapshot_dir(root.join("pages"))
        .with_transcript_dir(root.join("transcripts"))
        .with_source_dir(root.join("videos"))
        .with_output_dir(root.join("output"))
        .enable_clips(false)
        .with_workers(2)
        .build()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_stages_on_multi_chapter_page() {
    let page = two_chapter_page("PT1M40S");

    let fragments = extract_fragments(&page).unwrap();
    assert_eq!(fragments.len(), 2);

    let image = stitch(&fragments).unwrap();
    assert_eq!((image.width, image.height), (1000, 40));
    let offsets: Vec<u32> = image.groups.iter().map(|g| g.offset).collect();
    assert_eq!(offsets, vec![0, 500]);

    let samples = sample(&image.to_svg(), 100.0, &SamplerConfig::default());
    assert_eq!(samples.len(), 8);
    for (i, s) in samples.iter().enumerate() {
        assert!((s.time - i as f64 * 10.0).abs() < 1e-9);
    }

    let analysis = analyze(&samples, DEFAULT_THRESHOLD);
    assert!((analysis.average_attention - 30.0).abs() < 1e-9);
    assert_eq!(analysis.rises.len(), 1);
    assert!(approx(analysis.rises[0].start, 30.0) && approx(analysis.rises[0].end, 40.0));
    assert_eq!(analysis.falls.len(), 2);
    assert!(approx(analysis.falls[0].start, 0.0) && approx(analysis.falls[0].end, 20.0));
    assert!(approx(analysis.falls[1].start, 50.0) && approx(analysis.falls[1].end, 70.0));

    let transcript = heatclip::transcript::parse_srt(SUBTITLES).unwrap();
    let sections = map_intervals(Some(&transcript), &analysis);
    let requests = clip_requests("vidA", &analysis, &sections);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].transcript_text, "peak one peak two");
    assert_eq!(requests[0].file_stem(), "vidA_30000_40000");
}

#[tokio::test]
async fn test_snapshot_batch_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path()).await;

    let config = config_for(temp_dir.path());
    let processor = BatchProcessor::new(config, 2);
    let result = processor
        .process_videos(vec!["vidA".to_string(), "vidB".to_string(), "vidC".to_string()])
        .await
        .unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.no_heatmap, 2);

    let vid_a = &result.results[0];
    assert_eq!(vid_a.video_id, "vidA");
    assert_eq!(vid_a.status, VideoStatus::Succeeded);
    assert_eq!(vid_a.duration_seconds, Some(100.0));
    assert_eq!(vid_a.sample_count, 8);
    assert_eq!(vid_a.transcript_entries, Some(4));
    assert_eq!(vid_a.clip_requests.len(), 1);
    assert_eq!(vid_a.clip_requests[0].transcript_text, "peak one peak two");
    assert_eq!(vid_a.sections.falls.len(), 2);

    assert_eq!(result.results[1].status, VideoStatus::NoHeatmap);
    assert!(result.results[2].error_message.is_some());

    let manifest = temp_dir.path().join("output/heatclip_results.json");
    assert!(manifest.exists());
}

#[tokio::test]
async fn test_discovered_snapshots_feed_batch() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path()).await;

    let fetcher = SnapshotFetcher::new(temp_dir.path().join("pages"));
    let ids = fetcher.discover();
    assert_eq!(ids, vec!["vidA".to_string(), "vidB".to_string()]);

    tokio_test::assert_ok!(fetcher.fetch("vidA").await);
    let missing = tokio_test::assert_err!(fetcher.fetch("vidZ").await);
    assert!(matches!(missing, HeatmapError::HeatmapNotFound(_)));
}

#[tokio::test]
async fn test_transcripts_can_be_disabled() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path()).await;

    let config = ConfigBuilder::from_config(config_for(temp_dir.path()))
        .enable_transcripts(false)
        .build();
    let result = BatchProcessor::new(config, 1)
        .process_videos(vec!["vidA".to_string()])
        .await
        .unwrap();

    let vid_a = &result.results[0];
    assert_eq!(vid_a.status, VideoStatus::Succeeded);
    assert!(vid_a.transcript_entries.is_none());
    assert_eq!(vid_a.clip_requests[0].transcript_text, "");
}

#[tokio::test]
async fn test_custom_transcript_chain() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path()).await;
    let other = temp_dir.path().join("other");
    fs::create_dir_all(&other).await.unwrap();
    fs::write(
        other.join("vidA.de.srt"),
        "1\n00:00:33,000 --> 00:00:34,000\nhallo\n",
    )
    .await
    .unwrap();

    let chain = ProviderChain::new().with_provider(SrtFileProvider::new(&other, vec!["de".to_string()]));
    let result = BatchProcessor::new(config_for(temp_dir.path()), 1)
        .with_transcripts(chain)
        .process_videos(vec!["vidA".to_string()])
        .await
        .unwrap();

    assert_eq!(result.results[0].clip_requests[0].transcript_text, "hallo");
}

#[test]
fn test_config_file_with_partial_sections() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("heatclip.toml");
    std::fs::write(
        &path,
        "[heatmap]\nthreshold = 2.5\n\n[clips]\nenabled = false\n",
    )
    .unwrap();

    let config = tokio_test::assert_ok!(Config::from_file(&path));
    assert_eq!(config.heatmap.threshold, 2.5);
    assert!(!config.clips.enabled);
    assert_eq!(config.heatmap.view_width, 1000.0);
    tokio_test::assert_ok!(config.validate());

    let broken = ConfigBuilder::new().with_workers(0).build();
    tokio_test::assert_err!(broken.validate());
}

#[test]
fn test_blocking_snapshot_read() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("abc.html"), two_chapter_page("PT10S")).unwrap();

    let fetcher = SnapshotFetcher::new(temp_dir.path());
    let markup = tokio_test::block_on(fetcher.fetch("abc")).unwrap();
    assert_eq!(heatclip::page::extract_duration(&markup), Some(10.0));
}
