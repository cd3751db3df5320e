use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ab_inference::{ConversionSummary, conversion_summary};
use ab_ingest::{DuplicatePolicy, SyntheticConfig, clean_and_join, generate};
use ab_viz::{conversion_by_arm, conversion_by_arm_country, conversion_by_country};
use ab_viz_render::config::{VizConfig, resolve_config};
use ab_viz_render::{RenderError, render_json_svg, render_svg, render_to_bytes, render_to_file};

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("abstat_render_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn summary() -> ConversionSummary {
    let data = generate(&SyntheticConfig { n_users: 2_000, seed: 5, ..Default::default() }).unwrap();
    let cleaned = clean_and_join(&data.interactions, &data.countries, DuplicatePolicy::CrossArm);
    conversion_summary(&cleaned.records).unwrap()
}

#[test]
fn renders_all_three_charts() {
    let s = summary();
    let config = VizConfig::default();
    for art in [conversion_by_arm(&s), conversion_by_country(&s), conversion_by_arm_country(&s)] {
        let svg = render_svg(&art, &config).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(&art.title));
        assert!(svg.contains(">Conversion rate<"));
        for c in &art.categories {
            assert!(svg.contains(&format!(">{c}<")), "missing category {c}");
        }
    }
}

#[test]
fn crossed_chart_has_group_legend() {
    let s = summary();
    let svg = render_svg(&conversion_by_arm_country(&s), &VizConfig::default()).unwrap();
    assert!(svg.contains(">Group<"));
    assert!(svg.contains(">control<"));
    assert!(svg.contains(">treatment<"));
}

#[test]
fn json_artifact_renders_identically() {
    let art = conversion_by_arm(&summary());
    let json = serde_json::to_string(&art).unwrap();
    let config = VizConfig::default();
    let from_json = render_json_svg(&json, &config).unwrap();
    assert!(from_json.contains(&art.title));
    assert!(matches!(render_json_svg("{}", &config), Err(RenderError::Deserialize(_))));

    let mut wrong = art.clone();
    wrong.schema_version = "other_v1".into();
    assert!(matches!(render_svg(&wrong, &config), Err(RenderError::Schema(_))));
}

#[test]
fn minimal_theme_drops_grid() {
    let art = conversion_by_country(&summary());
    let minimal = resolve_config(Some("minimal"), None).unwrap();
    let svg = render_svg(&art, &minimal).unwrap();
    assert!(!svg.contains("stroke-dasharray"));
    let default = render_svg(&art, &VizConfig::default()).unwrap();
    assert!(default.contains("stroke-dasharray"));
}

#[test]
fn writes_svg_file_and_rejects_unknown_format() {
    let art = conversion_by_arm(&summary());
    let config = VizConfig::default();
    let path = tmp_path("conversion_by_group.svg");
    render_to_file(&art, &path, &config).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render_svg(&art, &config).unwrap());
    std::fs::remove_file(&path).ok();

    assert!(matches!(render_to_bytes(&art, "bmp", &config), Err(RenderError::UnknownFormat(_))));
}
