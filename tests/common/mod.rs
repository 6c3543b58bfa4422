//! Fake probe tool shared by the process-driving tests.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use ytbatch::Config;

const SCRIPT: &str = r#"#!/bin/sh
echo "$*" >> "@LOG@"
for arg in "$@"; do url="$arg"; done

case "$*" in
  *--get-title*)
    case "$url" in
      *notitle*) exit 1;;
      *hangtitle*) sleep 30;;
    esac
    echo "Fake: Title?"
    exit 0;;
  *--flat-playlist*)
    case "$url" in *empty*) exit 1;; esac
    echo "https://media.test/item1"
    echo "WARNING: noise"
    echo "  https://media.test/item2  "
    exit 0;;
  *" -F "*)
    case "$url" in *slow*) sleep 5;; esac
    echo "[youtube] Extracting URL: $url"
    echo "[info] Available formats for x:"
    echo "ID  EXT   RESOLUTION | NOTE"
    echo "---------------------------"
    echo "140 m4a   audio only | audio only mp4a"
    echo "18  mp4   640x360    | avc1 mp4a"
    echo "137 mp4   1920x1080  | avc1 video only"
    exit 0;;
esac

case "$url" in
  *slow*)
    echo "[download] Destination: slow"
    sleep 30;;
  *broken*)
    echo "ERROR: broken stream" >&2
    exit 1;;
esac
echo "[download] Destination: file"
echo "[download]  50.0% of 1.00MiB" >&2
echo "WARNING: picking a lower quality" >&2
echo "[download] 100% of 1.00MiB" >&2
exit 0
"#;

/// Temporary directory holding the fake tool, its invocation log, and an
/// output directory.
pub struct FakeTool {
    pub dir: TempDir,
    pub tool: PathBuf,
    pub log: PathBuf,
}

impl FakeTool {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = dir.path().join("yt-dlp");
        let log = dir.path().join("invocations.log");
        fs::create_dir_all(dir.path().join("out")).expect("out dir");

        let script = SCRIPT.replace("@LOG@", &log.to_string_lossy());
        fs::write(&tool, script).expect("write script");
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).expect("chmod");

        Self { dir, tool, log }
    }

    pub fn config(&self) -> Config {
        Config {
            ytdlp_path: self.tool.clone(),
            deno_path: PathBuf::from("/opt/deno"),
            output_dir: self.out_dir(),
            ..Config::default()
        }
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// One line per tool invocation, arguments space-joined.
    pub fn invocations(&self) -> Vec<String> {
        read_lines(&self.log)
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
