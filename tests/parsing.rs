use std::fs;
use std::path::PathBuf;

use qimen_forecast::chart::{PalaceKey, Polarity, RepeatScope};
use qimen_forecast::chart_parser::parse;
use qimen_forecast::error::ParseError;
use qimen_forecast::identify::identify;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_single_palace_with_door_pressure() {
    let chart = parse("坎宮(北方)\n四害：死門門迫\n八門─死門\n").expect("chart should parse");
    let present: Vec<_> = chart.present_palaces().map(|p| p.key).collect();
    assert_eq!(present, vec![PalaceKey::Kan]);
    assert_eq!(PalaceKey::Kan.direction(), "北方");

    let kan = chart.palace(PalaceKey::Kan);
    assert_eq!(kan.door.as_deref(), Some("死門"));
    assert_eq!(kan.four_harms, vec!["死門門迫".to_string()]);
    assert_eq!(chart.total_harm_count, 1);

    // The explicit 門迫 line already covers the synthetic one.
    let identified = identify(&chart);
    assert_eq!(identified.total_harm_count, 1);
    assert_eq!(identified.palaces.len(), 8);
}

#[test]
fn text_without_headers_is_rejected() {
    let err = parse("公曆：2026年6月14日\n四害：死門門迫\n").unwrap_err();
    assert_eq!(err, ParseError::NoPalaceHeader { lines: 2 });
    assert!(parse("").is_err());
}

#[test]
fn parses_sample_chart_fixture() {
    let raw = read_fixture("sample_chart.txt");
    let chart = parse(&raw).expect("fixture should parse");

    assert_eq!(chart.present_palaces().count(), 3);
    assert_eq!(chart.questioner, Some(PalaceKey::Qian));
    assert_eq!(chart.opponent, Some(PalaceKey::Kun));
    assert_eq!(chart.value_star.as_deref(), Some("天沖"));
    assert_eq!(chart.value_door.as_deref(), Some("傷門"));
    assert_eq!(
        chart.meta.cycle.map(|d| (d.polarity, d.number)),
        Some((Polarity::Yang, 3))
    );
    assert_eq!(chart.global_patterns, vec!["三奇得使".to_string()]);
    assert_eq!(chart.repeat, RepeatScope::Local);

    let qian = chart.palace(PalaceKey::Qian);
    assert_eq!(qian.star.as_deref(), Some("天心"));
    assert_eq!(qian.deity.as_deref(), Some("值符"));
    // The stem pair and the pattern line name the same pattern once.
    assert_eq!(qian.patterns, vec!["青龍返首".to_string()]);

    let kun = chart.palace(PalaceKey::Kun);
    assert_eq!(
        kun.four_harms,
        vec!["死門門迫".to_string(), "丙空亡".to_string()]
    );
    assert_eq!(kun.patterns, vec!["太白入熒".to_string()]);

    let kan = chart.palace(PalaceKey::Kan);
    assert_eq!(kan.four_harms, vec!["丁入墓".to_string()]);
    assert_eq!(chart.value_star_palace().map(|p| p.key), Some(PalaceKey::Kan));
    assert_eq!(chart.parsed_harm_count, 3);
}

#[test]
fn harm_count_grows_only_by_synthetic_harms() {
    let raw = read_fixture("sample_chart.txt");
    let chart = parse(&raw).expect("fixture should parse");
    let identified = identify(&chart);

    // 生門 (earth) presses 坎 (water).
    assert_eq!(
        identified.palace(PalaceKey::Kan).synthetic_harms,
        vec!["生門門迫".to_string()]
    );
    assert_eq!(identified.total_harm_count, chart.total_harm_count + 1);
    assert!(identified.total_harm_count >= chart.parsed_harm_count);
}

#[test]
fn identify_is_idempotent() {
    let raw = read_fixture("sample_chart.txt");
    let chart = parse(&raw).expect("fixture should parse");
    let once = identify(&chart);
    let twice = identify(&once);
    assert_eq!(once, twice);
}

#[test]
fn global_repeat_marks_whole_chart() {
    let chart = parse("全局格局：全局伏吟\n離宮（南方）\n八門─景門\n").expect("chart should parse");
    assert_eq!(chart.repeat, RepeatScope::Global("全局伏吟".to_string()));
}

#[test]
fn partial_lines_degrade_to_missing_fields() {
    let chart = parse("震宮(東方)\n八門─\n九星─不知\n四害：\n").expect("chart should parse");
    let zhen = chart.palace(PalaceKey::Zhen);
    assert!(zhen.door.is_none());
    assert!(zhen.star.is_none());
    assert!(zhen.four_harms.is_empty());
    assert_eq!(chart.parsed_harm_count, 0);
}

#[test]
fn duplicate_harm_lines_inflate_the_count() {
    let chart = parse("乾宮(西北)\n四害：庚擊刑\n四害：庚擊刑\n八門─開門\n").expect("chart should parse");
    let qian = chart.palace(PalaceKey::Qian);
    assert_eq!(qian.four_harms, vec!["庚擊刑".to_string(), "庚擊刑".to_string()]);
    assert_eq!(chart.parsed_harm_count, 2);
    assert_eq!(chart.total_harm_count, 2);
}
