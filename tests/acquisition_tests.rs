//! Acquisition engine tests against a scripted stand-in for yt-dlp
#![cfg(unix)]

mod common;

use common::{fake_tool, Recorder};
use mediaforge::domain::errors::AcquisitionError;
use mediaforge::{AcquisitionEngine, FormatRequest, MediaFormat, ProgressEvent};
use std::time::Duration;
use tempfile::TempDir;

const URL: &str = "https://www.example.com/watch?v=abc";

async fn wait_until_busy(engine: &AcquisitionEngine) {
    for _ in 0..250 {
        if engine.is_busy() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("engine never started the tool");
}

#[tokio::test]
async fn test_fetch_reports_progress_then_finished() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let script = format!(
        r#"mkdir -p "{out}"
echo "[mediaforge] filename={out}/Clip.mp4"
echo "[mediaforge] status=downloading downloaded_bytes=500 total_bytes=1000 total_bytes_estimate=NA speed=250.0 eta=2"
echo "some chatter on stderr" >&2
echo "[mediaforge] status=downloading downloaded_bytes=1000 total_bytes=1000 total_bytes_estimate=NA speed=250.0 eta=0"
echo "[mediaforge] status=finished downloaded_bytes=1000 total_bytes=1000 total_bytes_estimate=NA speed=NA eta=NA"
printf 'data' > "{out}/Clip.mp4"
echo "[mediaforge] filepath={out}/Clip.mp4""#,
        out = out.display()
    );
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", &script));
    let recorder = Recorder::default();

    let path = engine
        .fetch(URL, &out, &FormatRequest::container("mp4"), &recorder)
        .await
        .unwrap();

    assert_eq!(path, out.join("Clip.mp4"));
    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].percentage(), Some(50.0));
    assert_eq!(events[1].percentage(), Some(100.0));
    match &events[2] {
        ProgressEvent::Finished {
            result_path,
            total_bytes,
        } => {
            assert_eq!(result_path, &path);
            assert_eq!(*total_bytes, Some(4));
        }
        other => panic!("expected Finished, got {:?}", other),
    }
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_unknown_total_is_indeterminate() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().to_path_buf();
    let script = format!(
        r#"echo "[mediaforge] status=downloading downloaded_bytes=2048 total_bytes=NA total_bytes_estimate=NA speed=NA eta=NA"
printf 'x' > "{out}/Live.webm"
echo "[mediaforge] filepath={out}/Live.webm""#,
        out = out.display()
    );
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", &script));
    let recorder = Recorder::default();

    engine
        .fetch(URL, &out, &FormatRequest::container("webm"), &recorder)
        .await
        .unwrap();

    let events = recorder.events();
    assert!(events[0].is_indeterminate());
    assert!(matches!(events[0], ProgressEvent::Downloading { downloaded_bytes: 2048, .. }));
}

#[tokio::test]
async fn test_extension_substitution_after_audio_extraction() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().to_path_buf();
    // Prepared name is the pre-extraction container and no final path is printed
    let script = format!(
        r#"echo "[mediaforge] filename={out}/Song.webm"
printf 'abc' > "{out}/Song.mp3""#,
        out = out.display()
    );
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", &script));

    let path = engine
        .fetch(URL, &out, &FormatRequest::container("mp3"), &Recorder::default())
        .await
        .unwrap();
    assert_eq!(path, out.join("Song.mp3"));
}

#[tokio::test]
async fn test_directory_scan_fallback() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("downloads");
    let script = format!(
        r#"mkdir -p "{out}"
echo "[mediaforge] filename={out}/Talk.f137.mp4"
printf 'x' > "{out}/Talk.f137.mp4.part"
printf 'x' > "{out}/Talk.f137.mkv""#,
        out = out.display()
    );
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", &script));

    // The merged container differs from the prepared name and no final path is printed
    let path = engine
        .fetch(URL, &out, &FormatRequest::best(), &Recorder::default())
        .await
        .unwrap();
    assert_eq!(path, out.join("Talk.f137.mkv"));
}

#[tokio::test]
async fn test_unresolvable_output_is_file_not_found() {
    let dir = TempDir::new().unwrap();
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", "exit 0"));
    let recorder = Recorder::default();

    let result = engine
        .fetch(URL, dir.path(), &FormatRequest::best(), &recorder)
        .await;
    assert!(matches!(result, Err(AcquisitionError::FileNotFound { .. })));
    assert!(matches!(recorder.last(), Some(ProgressEvent::Error { .. })));
}

#[tokio::test]
async fn test_invalid_url_classification() {
    let dir = TempDir::new().unwrap();
    let script = r#"echo "ERROR: [generic] 'nope' is not a valid URL." >&2
exit 1"#;
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", script));

    let result = engine
        .fetch("nope", dir.path(), &FormatRequest::best(), &Recorder::default())
        .await;
    match result {
        Err(AcquisitionError::InvalidUrl { url, diagnostic }) => {
            assert_eq!(url, "nope");
            assert!(diagnostic.contains("is not a valid URL"));
        }
        other => panic!("expected InvalidUrl, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_transcoder_classification() {
    let dir = TempDir::new().unwrap();
    let script = r#"echo "WARNING: something minor" >&2
echo "ERROR: Postprocessing: ffmpeg not found. Please install or provide the path using --ffmpeg-location" >&2
exit 1"#;
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", script));

    let result = engine
        .fetch(URL, dir.path(), &FormatRequest::container("mp3"), &Recorder::default())
        .await;
    assert!(matches!(result, Err(AcquisitionError::MissingTranscoder { .. })));
}

#[tokio::test]
async fn test_other_failure_keeps_exit_code_and_diagnostic() {
    let dir = TempDir::new().unwrap();
    let script = r#"echo "ERROR: first problem" >&2
echo "ERROR: Unable to download webpage: HTTP Error 403: Forbidden" >&2
exit 2"#;
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", script));
    let recorder = Recorder::default();

    let result = engine
        .fetch(URL, dir.path(), &FormatRequest::best(), &recorder)
        .await;
    match result {
        Err(AcquisitionError::ToolFailure {
            exit_code,
            diagnostic,
        }) => {
            assert_eq!(exit_code, Some(2));
            assert!(diagnostic.contains("HTTP Error 403"));
        }
        other => panic!("expected ToolFailure, got {:?}", other),
    }
    assert_eq!(recorder.count_terminal(), 1);
}

#[tokio::test]
async fn test_missing_tool_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let engine = AcquisitionEngine::new(mediaforge::ToolCommand::new("/nonexistent/yt-dlp"));

    let result = engine
        .fetch(URL, dir.path(), &FormatRequest::best(), &Recorder::default())
        .await;
    assert!(matches!(result, Err(AcquisitionError::ToolUnavailable(_))));
}

#[tokio::test]
async fn test_cancel_stops_download_without_finished() {
    let dir = TempDir::new().unwrap();
    let script = r#"echo "[mediaforge] status=downloading downloaded_bytes=1 total_bytes=100 total_bytes_estimate=NA speed=1.0 eta=99"
sleep 30"#;
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", script));
    let recorder = Recorder::default();

    let format = FormatRequest::best();
    let fetch = engine.fetch(URL, dir.path(), &format, &recorder);
    let cancel = async {
        wait_until_busy(&engine).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.cancel_fetch()
    };

    let (result, cancelled) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(fetch, cancel)
    })
    .await
    .expect("cancellation should stop the tool promptly");

    assert!(cancelled);
    assert!(matches!(result, Err(AcquisitionError::UserCancelled)));
    assert!(recorder
        .events()
        .iter()
        .all(|e| !matches!(e, ProgressEvent::Finished { .. })));
    assert!(matches!(recorder.last(), Some(ProgressEvent::Error { .. })));
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_second_fetch_is_busy() {
    let dir = TempDir::new().unwrap();
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", "sleep 30"));

    let format = FormatRequest::best();
    let first_recorder = Recorder::default();
    let first = engine.fetch(URL, dir.path(), &format, &first_recorder);
    let second = async {
        wait_until_busy(&engine).await;
        let result = engine
            .fetch(URL, dir.path(), &FormatRequest::best(), &Recorder::default())
            .await;
        engine.cancel_fetch();
        result
    };

    let (first, second) = tokio::join!(first, second);
    assert!(matches!(second, Err(AcquisitionError::Busy)));
    assert!(matches!(first, Err(AcquisitionError::UserCancelled)));
}

#[tokio::test]
async fn test_cancel_when_idle_is_noop() {
    let engine = AcquisitionEngine::new(mediaforge::ToolCommand::new("yt-dlp"));
    assert!(!engine.cancel_fetch());
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_list_available_streams_from_json() {
    let dir = TempDir::new().unwrap();
    let json = r#"{"formats":[
{"format_id":"18","ext":"mp4","width":640,"height":360,"fps":30,"vcodec":"avc1","acodec":"mp4a","filesize":1000},
{"format_id":"137","ext":"mp4","width":1920,"height":1080,"fps":30,"vcodec":"avc1","acodec":"none","filesize":9000},
{"format_id":"hls-1","ext":"mp4","protocol":"m3u8_native","width":1920,"height":1080,"vcodec":"avc1","acodec":"mp4a"}
]}"#;
    let script = format!("cat <<'JSON'\n{}\nJSON", json);
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", &script));

    let streams = engine.list_available_streams(URL).await.unwrap();
    let ids: Vec<&str> = streams.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["137", "18"]);
    assert!(streams[0].is_video_only);
}

#[tokio::test]
async fn test_video_only_stream_is_paired_with_audio() {
    let dir = TempDir::new().unwrap();
    let json = r#"{"formats":[
{"format_id":"18","ext":"mp4","width":640,"height":360,"vcodec":"avc1","acodec":"mp4a"},
{"format_id":"137","ext":"mp4","width":1920,"height":1080,"vcodec":"avc1","acodec":"none"}
]}"#;
    let script = format!("cat <<'JSON'\n{}\nJSON", json);
    let engine = AcquisitionEngine::new(fake_tool(dir.path(), "yt-dlp.sh", &script));
    let mp4 = MediaFormat::Mp4;

    assert_eq!(
        engine.stream_selection(URL, "137", Some(&mp4)).await.unwrap(),
        "137+bestaudio"
    );
    assert_eq!(
        engine
            .stream_selection(URL, "137", Some(&MediaFormat::Mp3))
            .await
            .unwrap(),
        "137"
    );
    assert_eq!(engine.stream_selection(URL, "18", None).await.unwrap(), "18");
    assert_eq!(engine.stream_selection(URL, "999", None).await.unwrap(), "999");
    assert_eq!(
        engine.stream_selection(URL, "137+140", None).await.unwrap(),
        "137+140"
    );
}
