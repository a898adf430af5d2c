//! End-to-end checks of the command-line surface

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mediaforge() -> Command {
    let mut cmd = Command::cargo_bin("mediaforge").unwrap();
    cmd.env_remove("MEDIAFORGE_CONFIG")
        .env_remove("RUST_LOG")
        // Present on every unix host; checks that fail earlier never run it
        .env("MEDIAFORGE_FFMPEG", "sh")
        .env("MEDIAFORGE_FFPROBE", "/nonexistent/ffprobe")
        .env("MEDIAFORGE_YTDLP", "/nonexistent/yt-dlp");
    cmd
}

#[test]
fn test_help_lists_commands() {
    mediaforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("streams"))
        .stdout(predicate::str::contains("image"));
}

#[test]
fn test_version() {
    mediaforge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_convert_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    mediaforge()
        .args(["convert", "--format", "gif"])
        .arg(dir.path().join("missing.mp4"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_convert_rejects_bad_time() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mp4");
    std::fs::write(&input, b"video").unwrap();

    mediaforge()
        .args(["convert", "--format", "mp4", "--start", "soon"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid start time"));
}

#[test]
fn test_convert_rejects_unknown_preset() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mp4");
    std::fs::write(&input, b"video").unwrap();

    mediaforge()
        .args(["convert", "--format", "mp4", "--preset", "warp-speed"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("warp-speed"));
}

#[test]
fn test_fetch_with_missing_tool_fails() {
    let dir = TempDir::new().unwrap();
    mediaforge()
        .args(["fetch", "https://www.example.com/watch?v=abc", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unavailable"));
}

#[test]
fn test_unknown_log_level_is_a_usage_error() {
    mediaforge()
        .args(["--log-level", "loud", "streams", "https://www.example.com"])
        .assert()
        .failure()
        .code(2);
}

/// Config pointing yt-dlp at a script that answers `-J` with a stream listing
/// and otherwise records its arguments and writes `out/v.mp4`
#[cfg(unix)]
fn scripted_ytdlp(dir: &std::path::Path) -> std::path::PathBuf {
    let script = dir.join("yt-dlp.sh");
    std::fs::write(
        &script,
        format!(
            r#"case " $* " in
  *" -J "*) cat <<'JSON'
{{"formats":[{{"format_id":"137","ext":"mp4","width":1920,"height":1080,"vcodec":"avc1","acodec":"none"}}]}}
JSON
  exit 0;;
esac
printf '%s\n' "$@" > "{dir}/args.txt"
mkdir -p "{dir}/out"
printf 'x' > "{dir}/out/v.mp4"
echo "[mediaforge] filepath={dir}/out/v.mp4""#,
            dir = dir.display()
        ),
    )
    .unwrap();

    let config = dir.join("config.toml");
    std::fs::write(
        &config,
        format!(
            "[tools.ytdlp]\nprogram = \"sh\"\nprefix_args = [\"{}\"]\n",
            script.display()
        ),
    )
    .unwrap();
    config
}

#[cfg(unix)]
fn selection_passed(dir: &std::path::Path) -> String {
    let args = std::fs::read_to_string(dir.join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    let f = args.iter().position(|a| *a == "-f").unwrap();
    args[f + 1].to_string()
}

#[cfg(unix)]
#[test]
fn test_fetch_without_format_takes_best_unmodified() {
    let dir = TempDir::new().unwrap();
    let config = scripted_ytdlp(dir.path());

    mediaforge()
        .env_remove("MEDIAFORGE_YTDLP")
        .arg("--config")
        .arg(&config)
        .args(["fetch", "https://www.example.com/watch?v=abc", "--dir"])
        .arg(dir.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("v.mp4"));

    assert_eq!(selection_passed(dir.path()), "bestvideo+bestaudio/best");
    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert!(!args.contains("--merge-output-format"));
}

#[cfg(unix)]
#[test]
fn test_fetch_pairs_video_only_stream_with_audio() {
    let dir = TempDir::new().unwrap();
    let config = scripted_ytdlp(dir.path());

    mediaforge()
        .env_remove("MEDIAFORGE_YTDLP")
        .arg("--config")
        .arg(&config)
        .args([
            "fetch",
            "https://www.example.com/watch?v=abc",
            "--stream-id",
            "137",
            "--format",
            "mp4",
            "--dir",
        ])
        .arg(dir.path().join("out"))
        .assert()
        .success();

    assert_eq!(selection_passed(dir.path()), "137+bestaudio");
}
