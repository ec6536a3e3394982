use std::path::{Path, PathBuf};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_gdp-race")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "gdp-race.exe"
            } else {
                "gdp-race"
            });
            p
        })
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn arg(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

const CSV: &str = "\
Country Name,Indicator Code,2000,2001
Germany,NY.GDP,1000000000,2000000000
Japan,NY.GDP,3000000000,1500000000
Unknown Country,NY.GDP,5,6
";

fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
    image::RgbaImage::from_pixel(50, 30, image::Rgba([200, 0, 0, 255]))
        .save(dir.join("flag.png"))
        .unwrap();

    let csv = dir.join("gdp.csv");
    std::fs::write(&csv, CSV).unwrap();

    let config = dir.join("race.json");
    let json = serde_json::json!({
        "countries": ["Germany", "Japan"],
        "registry": [
            { "name": "Germany", "color": "orange", "icon": "flag.png" },
            { "name": "Japan", "color": "white", "icon": "flag.png" }
        ],
        "canvas": { "width": 120, "height": 200 },
        "repeat_frames": 1,
        "draw_text": false
    });
    std::fs::write(&config, serde_json::to_vec_pretty(&json).unwrap()).unwrap();
    (csv, config)
}

#[test]
fn cli_frame_writes_png() {
    let dir = scratch_dir("frame");
    let (csv, config) = write_fixture(&dir);
    let out = dir.join("out.png");
    let _ = std::fs::remove_file(&out);

    let status = std::process::Command::new(exe())
        .args(["frame", "--csv", &arg(&csv), "--config", &arg(&config)])
        .args(["--year", "2001", "--out", &arg(&out)])
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (120, 200));
}

#[test]
fn cli_frames_writes_every_step() {
    let dir = scratch_dir("frames");
    let (csv, config) = write_fixture(&dir);
    let out_dir = dir.join("steps");
    let _ = std::fs::remove_dir_all(&out_dir);

    let status = std::process::Command::new(exe())
        .args(["frames", "--csv", &arg(&csv), "--config", &arg(&config)])
        .args(["--out-dir", &arg(&out_dir)])
        .status()
        .unwrap();

    assert!(status.success());
    // 2000, 2001, then 2001 held once.
    let n = std::fs::read_dir(&out_dir).unwrap().count();
    assert_eq!(n, 3);
}

#[test]
fn cli_rejects_unterminated_quote_without_writing_video() {
    let dir = scratch_dir("malformed");
    let csv = dir.join("bad.csv");
    std::fs::write(
        &csv,
        "Country Name,2000\n\"Germany,1000\nJapan,2000\n",
    )
    .unwrap();
    let out = dir.join("never.mp4");
    let _ = std::fs::remove_file(&out);

    let output = std::process::Command::new(exe())
        .args(["render", "--csv", &arg(&csv), "--out", &arg(&out)])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unterminated"), "stderr: {stderr}");
    assert!(!out.exists());
}

#[test]
fn cli_fails_when_the_label_font_cannot_be_loaded() {
    let dir = scratch_dir("missing_font");
    let (csv, _) = write_fixture(&dir);
    let config = dir.join("with_text.json");
    std::fs::write(
        &config,
        r#"{ "countries": ["Germany", "Japan"],
             "registry": [{ "name": "Germany", "color": "orange", "icon": "flag.png" },
                          { "name": "Japan", "color": "white", "icon": "flag.png" }],
             "canvas": { "width": 120, "height": 200 } }"#,
    )
    .unwrap();
    let out = dir.join("out.png");
    let _ = std::fs::remove_file(&out);
    let font = dir.join("no-such-font.ttf");

    let output = std::process::Command::new(exe())
        .args(["frame", "--csv", &arg(&csv), "--config", &arg(&config)])
        .args(["--year", "2000", "--out", &arg(&out), "--font", &arg(&font)])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!out.exists());

    let status = std::process::Command::new(exe())
        .args(["frame", "--csv", &arg(&csv), "--config", &arg(&config)])
        .args(["--year", "2000", "--out", &arg(&out), "--font", &arg(&font)])
        .arg("--no-text")
        .status()
        .unwrap();
    assert!(status.success());
    assert!(out.exists());
}

#[test]
fn cli_reports_entities_without_registry_entry() {
    let dir = scratch_dir("unregistered");
    let (csv, _) = write_fixture(&dir);
    let config = dir.join("partial.json");
    std::fs::write(
        &config,
        r#"{ "countries": ["Germany", "Japan"],
             "registry": [{ "name": "Germany", "color": "orange", "icon": "flag.png" }] }"#,
    )
    .unwrap();
    let out = dir.join("out.png");

    let output = std::process::Command::new(exe())
        .args(["frame", "--csv", &arg(&csv), "--config", &arg(&config)])
        .args(["--year", "2000", "--out", &arg(&out)])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Japan"), "stderr: {stderr}");
}

#[test]
fn cli_prints_default_config() {
    let output = std::process::Command::new(exe())
        .arg("config")
        .output()
        .unwrap();

    assert!(output.status.success());
    let cfg: gdp_race::RaceConfig = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(cfg, gdp_race::RaceConfig::default());
}
