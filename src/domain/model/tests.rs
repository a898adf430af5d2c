// Unit tests for domain models

use super::*;

#[test]
fn test_time_spec_from_components() {
    let time = TimeSpec::from_components(1, 2, 3, 500);
    assert_eq!(time.seconds, 3723.5);
}

#[test]
fn test_time_spec_parse_seconds() {
    let time = TimeSpec::parse("123.456").unwrap();
    assert_eq!(time.seconds, 123.456);
}

#[test]
fn test_time_spec_parse_mm_ss() {
    let time = TimeSpec::parse("01:30.5").unwrap();
    assert_eq!(time.seconds, 90.5);
}

#[test]
fn test_time_spec_parse_hh_mm_ss() {
    let time = TimeSpec::parse("00:00:10").unwrap();
    assert_eq!(time.seconds, 10.0);

    let time = TimeSpec::parse("01:02:03.5").unwrap();
    assert_eq!(time.seconds, 3723.5);
}

#[test]
fn test_time_spec_parse_invalid() {
    assert!(TimeSpec::parse("invalid").is_err());
    assert!(TimeSpec::parse("00:60").is_err());
    assert!(TimeSpec::parse("01:60:00").is_err());
    assert!(TimeSpec::parse("-10").is_err());
    assert!(TimeSpec::parse("1:2:3:4").is_err());
}

#[test]
fn test_time_spec_display() {
    let time = TimeSpec::from_components(1, 2, 3, 456);
    assert_eq!(format!("{}", time), "01:02:03.456");

    let time = TimeSpec::from_seconds(20.0);
    assert_eq!(time.format_hms(), "00:00:20.000");
}

#[test]
fn test_downloading_event_percentage_only_with_total() {
    let event = ProgressEvent::downloading(512, Some(1024), Some(100.0), Some(5));
    assert_eq!(event.percentage(), Some(50.0));
    assert!(!event.is_indeterminate());

    let event = ProgressEvent::downloading(512, None, None, None);
    assert_eq!(event.percentage(), None);
    assert!(event.is_indeterminate());

    // A zero total is treated as unknown rather than as a division hazard
    let event = ProgressEvent::downloading(512, Some(0), None, None);
    assert!(event.is_indeterminate());
}

#[test]
fn test_converting_event_percentage_clamped() {
    let event = ProgressEvent::converting(5.0, Some(10.0), Some(1.5));
    assert_eq!(event.percentage(), Some(50.0));

    let event = ProgressEvent::converting(12.0, Some(10.0), None);
    assert_eq!(event.percentage(), Some(100.0));

    let event = ProgressEvent::converting(12.0, None, None);
    assert!(event.is_indeterminate());
}

#[test]
fn test_terminal_events() {
    let finished = ProgressEvent::Finished {
        result_path: PathBuf::from("out.mp4"),
        total_bytes: Some(10),
    };
    let error = ProgressEvent::Error {
        message: "boom".to_string(),
    };
    assert!(finished.is_terminal());
    assert!(error.is_terminal());
    assert!(!ProgressEvent::downloading(1, None, None, None).is_terminal());
}

#[test]
fn test_progress_event_serializes_with_status_tag() {
    let event = ProgressEvent::converting(5.0, Some(10.0), Some(2.0));
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["status"], "converting");
    assert_eq!(json["percentage"], 50.0);
}

#[test]
fn test_media_format_parse() {
    assert_eq!(MediaFormat::parse("MP4"), MediaFormat::Mp4);
    assert_eq!(MediaFormat::parse(".gif"), MediaFormat::Gif);
    assert_eq!(MediaFormat::parse("mkv"), MediaFormat::Other("mkv".to_string()));
    assert_eq!(MediaFormat::Other("mkv".to_string()).extension(), "mkv");
    assert!("".parse::<MediaFormat>().is_err());
}

#[test]
fn test_format_request_normalizes_inputs() {
    let request = FormatRequest::new(Some("  MP4 "), Some(""));
    assert_eq!(request.container_hint.as_deref(), Some("mp4"));
    assert_eq!(request.explicit_stream_id, None);

    let request = FormatRequest::new(Some(""), None);
    assert_eq!(request, FormatRequest::best());
}

fn video_only_stream() -> StreamDescriptor {
    StreamDescriptor {
        id: "137".to_string(),
        container: "mp4".to_string(),
        width: Some(1920),
        height: Some(1080),
        fps: Some(30.0),
        video_codec: Some("avc1.640028".to_string()),
        audio_codec: None,
        approx_size_bytes: Some(5 * 1024 * 1024),
        is_video_only: true,
        is_audio_only: false,
    }
}

#[test]
fn test_stream_selection_pairs_video_only_with_audio() {
    let stream = video_only_stream();
    assert_eq!(stream.selection_for(Some(&MediaFormat::Mp4)), "137+bestaudio");
    assert_eq!(stream.selection_for(None), "137+bestaudio");
    assert_eq!(stream.selection_for(Some(&MediaFormat::Mp3)), "137");
}

#[test]
fn test_stream_display_label() {
    let label = video_only_stream().display_label();
    assert_eq!(label, "1920x1080 30fps mp4 (avc1.640028) [video only] ~5.00 MB");
}
