use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::chart::{ChartRecord, Dun, PalaceKey, PalaceRecord, Polarity, RepeatScope, StemPair};
use crate::error::ParseError;
use crate::symbols::{self, DEITIES, DOORS, STARS};

const HARM_LABELS: &[&str] = &["四害：", "四害:"];
const DOOR_LABELS: &[&str] = &["八門─", "八門：", "八門:"];
const STAR_LABELS: &[&str] = &["九星─", "九星：", "九星:"];
const DEITY_LABELS: &[&str] = &["八神─", "八神：", "八神:"];
const PATTERN_LABELS: &[&str] = &["格局─", "格局：", "格局:"];

const SOLAR_LABELS: &[&str] = &["公曆：", "公曆:", "公历："];
const LUNAR_LABELS: &[&str] = &["農曆：", "農曆:", "农历："];
const CYCLE_LABELS: &[&str] = &["局數：", "局數:", "局数："];
const PILLAR_LABELS: &[&str] = &["四柱：", "四柱:"];
const VOID_LABELS: &[&str] = &["旬空：", "旬空:"];
const VALUE_STAR_LABELS: &[&str] = &["值符：", "值符:"];
const VALUE_DOOR_LABELS: &[&str] = &["值使：", "值使:"];
const QUESTIONER_LABELS: &[&str] = &["求測方：", "求測方:", "求测方："];
const OPPONENT_LABELS: &[&str] = &["對手方：", "對手方:", "对手方："];
const GLOBAL_PATTERN_LABELS: &[&str] = &["全局格局：", "全局格局:"];

const HARM_MARKERS: &[&str] = &["空亡", "入墓", "擊刑"];

static PALACE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([坎坤震巽乾兌兑艮離离])宮\s*[(（]([^)）]*)[)）]").expect("palace header regex")
});

static STEM_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([甲乙丙丁戊己庚辛壬癸])\s*┼\s*([甲乙丙丁戊己庚辛壬癸])").expect("stem pair regex")
});

static HARM_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:[(（](?P<pre>[^)）]+)[)）]\s*)?(?P<adj>[^\s：:、，,。()（）])?(?P<marker>空亡|入墓|擊刑)(?:\s*[(（](?P<post>[^)）]+)[)）])?",
    )
    .expect("harm token regex")
});

static CYCLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([陽阳陰阴])遁\s*([一二三四五六七八九1-9])").expect("cycle regex"));

/// Parses a chart transcript into a `ChartRecord`.
///
/// Only a transcript with no palace header at all is an error; every other
/// malformed line degrades to a missing field.
pub fn parse(text: &str) -> Result<ChartRecord, ParseError> {
    let mut chart = ChartRecord::empty();
    let mut cursor: Option<PalaceKey> = None;
    let mut headers = 0usize;
    let mut lines = 0usize;

    for raw in text.lines() {
        lines += 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(key) = palace_header(line) {
            // A new header closes whatever palace was open, complete or not,
            // and starts the slot over even if the palace was seen before.
            headers += 1;
            cursor = Some(key);
            let dropped = chart.palace(key).four_harms.len();
            chart.parsed_harm_count -= dropped;
            let slot = chart.palace_mut(key);
            *slot = PalaceRecord::empty(key);
            slot.present = true;
            continue;
        }

        if parse_meta_line(&mut chart, line) {
            continue;
        }

        let Some(key) = cursor else {
            continue;
        };
        parse_palace_line(&mut chart, key, line);
    }

    if headers == 0 {
        return Err(ParseError::NoPalaceHeader { lines });
    }

    chart.repeat = classify_repeat(&chart);
    chart.total_harm_count = chart.parsed_harm_count;

    debug!(
        palaces = chart.present_palaces().count(),
        harms = chart.parsed_harm_count,
        repeat = ?chart.repeat,
        "parsed chart transcript"
    );
    Ok(chart)
}

fn palace_header(line: &str) -> Option<PalaceKey> {
    let caps = PALACE_HEADER.captures(line)?;
    let ch = caps.get(1)?.as_str().chars().next()?;
    PalaceKey::from_char(ch)
}

fn strip_label<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    labels
        .iter()
        .find_map(|label| line.strip_prefix(label))
        .map(str::trim)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_meta_line(chart: &mut ChartRecord, line: &str) -> bool {
    if let Some(rest) = strip_label(line, SOLAR_LABELS) {
        chart.meta.solar_date = non_empty(rest);
    } else if let Some(rest) = strip_label(line, LUNAR_LABELS) {
        chart.meta.lunar_date = non_empty(rest);
    } else if let Some(rest) = strip_label(line, CYCLE_LABELS) {
        chart.meta.cycle = parse_cycle(rest);
    } else if let Some(rest) = strip_label(line, PILLAR_LABELS) {
        chart.meta.four_pillars = non_empty(rest);
    } else if let Some(rest) = strip_label(line, VOID_LABELS) {
        chart.meta.void_time = non_empty(rest);
    } else if let Some(rest) = strip_label(line, VALUE_STAR_LABELS) {
        chart.value_star = symbols::find_symbol_in(rest, &STARS)
            .map(|e| e.name.to_string())
            .or_else(|| non_empty(rest));
    } else if let Some(rest) = strip_label(line, VALUE_DOOR_LABELS) {
        chart.value_door = symbols::find_symbol_in(rest, &DOORS)
            .map(|e| e.name.to_string())
            .or_else(|| non_empty(rest));
    } else if let Some(rest) = strip_label(line, QUESTIONER_LABELS) {
        chart.questioner = PalaceKey::from_label(rest);
    } else if let Some(rest) = strip_label(line, OPPONENT_LABELS) {
        chart.opponent = PalaceKey::from_label(rest);
    } else if let Some(rest) = strip_label(line, GLOBAL_PATTERN_LABELS) {
        for name in split_names(rest) {
            if !chart.global_patterns.contains(&name) {
                chart.global_patterns.push(name);
            }
        }
    } else {
        return false;
    }
    true
}

fn parse_cycle(raw: &str) -> Option<Dun> {
    let caps = CYCLE.captures(raw)?;
    let polarity = match caps.get(1)?.as_str() {
        "陽" | "阳" => Polarity::Yang,
        _ => Polarity::Yin,
    };
    let number = match caps.get(2)?.as_str() {
        "一" | "1" => 1,
        "二" | "2" => 2,
        "三" | "3" => 3,
        "四" | "4" => 4,
        "五" | "5" => 5,
        "六" | "6" => 6,
        "七" | "7" => 7,
        "八" | "8" => 8,
        _ => 9,
    };
    Some(Dun { polarity, number })
}

fn parse_palace_line(chart: &mut ChartRecord, key: PalaceKey, line: &str) {
    if let Some(rest) = strip_label(line, HARM_LABELS) {
        // Every non-empty harm line counts, duplicates included.
        if !rest.is_empty() {
            chart.palace_mut(key).four_harms.push(rest.to_string());
            chart.parsed_harm_count += 1;
        }
        return;
    }
    classify_palace_line(chart, key, line);

    // Harm markers count on any line, whatever else the line carried.
    if HARM_MARKERS.iter().any(|m| line.contains(m)) {
        for label in extract_harm_tokens(line) {
            chart.palace_mut(key).four_harms.push(label);
            chart.parsed_harm_count += 1;
        }
    }
}

fn classify_palace_line(chart: &mut ChartRecord, key: PalaceKey, line: &str) {
    if let Some(rest) = strip_label(line, DOOR_LABELS) {
        if let Some(entry) = symbols::find_symbol_in(rest, &DOORS) {
            chart.palace_mut(key).door = Some(entry.name.to_string());
        }
    } else if let Some(rest) = strip_label(line, STAR_LABELS) {
        if let Some(entry) = symbols::find_symbol_in(rest, &STARS) {
            chart.palace_mut(key).star = Some(entry.name.to_string());
        }
    } else if let Some(rest) = strip_label(line, DEITY_LABELS) {
        if let Some(entry) = symbols::find_symbol_in(rest, &DEITIES) {
            chart.palace_mut(key).deity = Some(entry.name.to_string());
        }
    } else if let Some(rest) = strip_label(line, PATTERN_LABELS) {
        let palace = chart.palace_mut(key);
        for name in split_names(rest) {
            palace.add_pattern(name);
        }
    } else if let Some(caps) = STEM_PAIR.captures(line) {
        let heaven = caps.get(1).and_then(|m| m.as_str().chars().next());
        let earth = caps.get(2).and_then(|m| m.as_str().chars().next());
        if let (Some(heaven), Some(earth)) = (heaven, earth) {
            let palace = chart.palace_mut(key);
            palace.stems = Some(StemPair { heaven, earth });
            if let Some(def) = symbols::pattern_by_stems(heaven, earth) {
                palace.add_pattern(def.name);
            }
        }
    }
}

/// Harm labels in a free-form line: `空亡（丙）` and `（丙）空亡` become `丙空亡`,
/// `乙入墓` stays as is, a bare marker stays bare.
pub fn extract_harm_tokens(line: &str) -> Vec<String> {
    HARM_TOKEN
        .captures_iter(line)
        .filter_map(|caps| {
            let marker = caps.name("marker")?.as_str();
            let qualifier = caps
                .name("post")
                .or_else(|| caps.name("pre"))
                .or_else(|| caps.name("adj"))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            Some(format!("{qualifier}{marker}"))
        })
        .collect()
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(|ch: char| matches!(ch, '、' | '，' | ',' | '；' | ';') || ch.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn classify_repeat(chart: &ChartRecord) -> RepeatScope {
    chart
        .all_patterns()
        .find(|name| symbols::is_global_repeat(name))
        .map(|name| RepeatScope::Global(name.to_string()))
        .unwrap_or(RepeatScope::Local)
}
