//! CLI integration tests against a tiny synthetic map.
//!
//! Uses `assert_cmd` with `CARGO_BIN_EXE_mapviz` to run the pre-built binary.

use assert_cmd::Command;
use image::{Rgba, RgbaImage};
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const A: [u8; 3] = [255, 0, 0];
const B: [u8; 3] = [0, 255, 0];
const SEA: [u8; 3] = [0, 0, 255];

/// 6x4 map: province 1 (columns 0-1, RED), province 2 (columns 2-3, GRN),
/// province 3 (columns 4-5, sea).
fn write_assets(dir: &Path) {
    let raster = RgbaImage::from_fn(6, 4, |x, _| {
        let [r, g, b] = match x {
            0 | 1 => A,
            2 | 3 => B,
            _ => SEA,
        };
        Rgba([r, g, b, 255])
    });
    raster.save(dir.join("provinces.png")).unwrap();
    fs::write(
        dir.join("definition.csv"),
        "province;red;green;blue;type;coastal;terrain;continent\n\
         1;255;0;0;land;true;plains;europe\n\
         2;0;255;0;land;false;hills;europe\n\
         3;0;0;255;sea;false;ocean;\n",
    )
    .unwrap();
    fs::write(
        dir.join("countries.json"),
        r##"{
            "RED": { "name": "Red Kingdom", "color": "#dc143c" },
            "GRN": { "name": "Green Union", "color": "#228b22" }
        }"##,
    )
    .unwrap();
    fs::write(dir.join("ownership.txt"), "1=RED\n2=GRN\n").unwrap();
}

fn fixture() -> TempDir {
    let dir = tempdir().unwrap();
    write_assets(dir.path());
    dir
}

fn mapviz(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mapviz"));
    cmd.arg("--assets").arg(dir);
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mapviz"));
    cmd.arg("--help").assert().success();
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mapviz"));
    cmd.arg("--version").assert().success();
}

#[test]
fn test_export_to_stdout() {
    let dir = fixture();
    mapviz(dir.path())
        .arg("export")
        .assert()
        .success()
        .stdout(contains("# province ownership snapshot"))
        .stdout(contains("1=RED\n2=GRN\n"));
}

#[test]
fn test_lookup() {
    let dir = fixture();
    mapviz(dir.path())
        .args(["lookup", "0", "0"])
        .assert()
        .success()
        .stdout(contains("province 1 (Land, owner RED)"));
    mapviz(dir.path())
        .args(["lookup", "5", "3"])
        .assert()
        .success()
        .stdout(contains("province 3 (Sea, owner none)"));
    mapviz(dir.path())
        .args(["lookup", "-1", "0"])
        .assert()
        .success()
        .stdout(contains("-1,0 -> none"));
}

#[test]
fn test_political_layer() {
    let dir = fixture();
    let out = dir.path().join("political.png");
    mapviz(dir.path())
        .arg("political")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("Saved"));

    let image = image::open(&out).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (6, 4));
    assert_eq!(image.get_pixel(0, 0).0, [0xdc, 0x14, 0x3c, 255]);
    assert_eq!(image.get_pixel(3, 3).0, [0x22, 0x8b, 0x22, 255]);
    assert_eq!(image.get_pixel(5, 0).0, [64, 164, 223, 255]);
}

#[test]
fn test_border_layer_and_outline() {
    let dir = fixture();
    let out = dir.path().join("borders.png");
    mapviz(dir.path())
        .arg("borders")
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    let image = image::open(&out).unwrap().to_rgba8();
    // The RED/GRN interface sits between columns 1 and 2.
    assert!(image.get_pixel(1, 0)[3] > 0);
    assert!(image.get_pixel(2, 1)[3] > 0);
    assert_eq!(image.get_pixel(0, 0)[3], 0);

    let outline = dir.path().join("outline.png");
    mapviz(dir.path())
        .args(["borders", "--province", "2", "--output"])
        .arg(&outline)
        .assert()
        .success();
    let image = image::open(&outline).unwrap().to_rgba8();
    assert!(image.get_pixel(2, 0)[3] > 0);
    assert_eq!(image.get_pixel(0, 0)[3], 0);

    mapviz(dir.path())
        .args(["borders", "--province", "99"])
        .assert()
        .failure()
        .stderr(contains("no province with id 99"));
}

#[test]
fn test_render_size() {
    let dir = fixture();
    let out = dir.path().join("map.png");
    mapviz(dir.path())
        .args(["render", "--width", "64", "--height", "48", "--select", "1", "--output"])
        .arg(&out)
        .assert()
        .success();
    let image = image::open(&out).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (64, 48));
    // Corners lie outside the zoomed raster and show the background.
    assert_eq!(image.get_pixel(0, 0).0, [0x33, 0x4a, 0x5e, 255]);
}

#[test]
fn test_labels_json() {
    let dir = fixture();
    fs::write(
        dir.path().join("config.json"),
        r#"{ "labels": { "sample_stride": 1 } }"#,
    )
    .unwrap();
    let output = mapviz(dir.path())
        .arg("--config")
        .arg(dir.path().join("config.json"))
        .args(["labels", "--zoom", "4"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["zoom"], 4.0);
    assert!(report["anchors"]["RED"]["x"].is_number());
    assert!(report["anchors"]["GRN"].is_object());
    assert!(report["visible"].is_array());
}

#[test]
fn test_import_writes_snapshot() {
    let dir = fixture();
    let input = dir.path().join("provinces.txt");
    fs::write(
        &input,
        "id;r;g;b;name\n\
         1;255;0;0;Greenford\n\
         2;0;255;0;Nowhere\n\
         3;0;0;255;Open Sea\n\
         4;1;2\n",
    )
    .unwrap();
    let rules = dir.path().join("rules.json");
    fs::write(
        &rules,
        r#"[{ "country": "GRN", "keywords": ["green"] }]"#,
    )
    .unwrap();
    let out = dir.path().join("imported.txt");

    mapviz(dir.path())
        .arg("import")
        .arg("--input")
        .arg(&input)
        .arg("--rules")
        .arg(&rules)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("Assigned: 1, Unmatched: 1, Skipped: 2"));

    let snapshot = fs::read_to_string(&out).unwrap();
    assert!(snapshot.contains("1=GRN"));
    assert!(snapshot.contains("2=GRN"));
}

#[test]
fn test_missing_raster_fails() {
    let dir = tempdir().unwrap();
    mapviz(dir.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(contains("provinces.png"));
}

#[test]
fn test_duplicate_colour_fails() {
    let dir = fixture();
    fs::write(
        dir.path().join("definition.csv"),
        "1;255;0;0;land\n2;0;255;0;land\n3;255;0;0;land\n",
    )
    .unwrap();
    mapviz(dir.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(contains("duplicate colour"));
}
