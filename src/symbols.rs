use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Auspicious,
    Inauspicious,
    Neutral,
}

impl Category {
    pub fn sign(self) -> f64 {
        match self {
            Category::Auspicious => 1.0,
            Category::Inauspicious => -1.0,
            Category::Neutral => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Auspicious => "吉",
            Category::Inauspicious => "凶",
            Category::Neutral => "平",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
}

/// Five-element domination: (attacker, victim).
const OVERCOMES: &[(Element, Element)] = &[
    (Element::Metal, Element::Wood),
    (Element::Wood, Element::Earth),
    (Element::Earth, Element::Water),
    (Element::Water, Element::Fire),
    (Element::Fire, Element::Metal),
];

impl Element {
    pub fn overcomes(self, other: Element) -> bool {
        OVERCOMES.iter().any(|(a, b)| *a == self && *b == other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Door,
    Star,
    Deity,
    Pattern,
    Harm,
}

/// Named football impacts, keyed by metric-style field names.
pub type Impacts = &'static [(&'static str, f64)];

#[derive(Debug, Clone, Copy)]
pub struct SymbolEntry {
    pub name: &'static str,
    pub kind: SymbolKind,
    pub category: Category,
    pub element: Option<Element>,
    pub impacts: Impacts,
}

impl SymbolEntry {
    pub fn impact(&self, field: &str) -> f64 {
        impact_of(self.impacts, field)
    }
}

pub fn impact_of(impacts: &[(&str, f64)], field: &str) -> f64 {
    impacts
        .iter()
        .filter(|(name, _)| *name == field)
        .map(|(_, v)| *v)
        .sum()
}

const fn door_entry(
    name: &'static str,
    category: Category,
    element: Element,
    impacts: Impacts,
) -> SymbolEntry {
    SymbolEntry {
        name,
        kind: SymbolKind::Door,
        category,
        element: Some(element),
        impacts,
    }
}

const fn star_entry(name: &'static str, category: Category, impacts: Impacts) -> SymbolEntry {
    SymbolEntry {
        name,
        kind: SymbolKind::Star,
        category,
        element: None,
        impacts,
    }
}

const fn deity_entry(name: &'static str, category: Category, impacts: Impacts) -> SymbolEntry {
    SymbolEntry {
        name,
        kind: SymbolKind::Deity,
        category,
        element: None,
        impacts,
    }
}

pub static DOORS: [SymbolEntry; 8] = [
    door_entry(
        "休門",
        Category::Auspicious,
        Element::Water,
        &[("defense", 0.10), ("fouls", -0.05)],
    ),
    door_entry(
        "生門",
        Category::Auspicious,
        Element::Earth,
        &[("attack", 0.15), ("possession", 0.10), ("shotsOnTarget", 0.10)],
    ),
    door_entry(
        "傷門",
        Category::Inauspicious,
        Element::Wood,
        &[("fouls", 0.20), ("yellowCards", 0.15), ("defense", -0.10)],
    ),
    door_entry(
        "杜門",
        Category::Neutral,
        Element::Wood,
        &[("attack", -0.10), ("defense", 0.15), ("possession", -0.05)],
    ),
    door_entry(
        "景門",
        Category::Neutral,
        Element::Fire,
        &[("dangerousAttacks", 0.10), ("offsides", 0.10)],
    ),
    door_entry(
        "死門",
        Category::Inauspicious,
        Element::Earth,
        &[("attack", -0.20), ("efficiency", -0.15), ("possession", -0.10)],
    ),
    door_entry(
        "驚門",
        Category::Inauspicious,
        Element::Metal,
        &[("yellowCards", 0.20), ("passAccuracy", -0.10)],
    ),
    door_entry(
        "開門",
        Category::Auspicious,
        Element::Metal,
        &[("attack", 0.20), ("corners", 0.10), ("passAccuracy", 0.05)],
    ),
];

pub static STARS: [SymbolEntry; 9] = [
    star_entry(
        "天蓬",
        Category::Inauspicious,
        &[("fouls", 0.15), ("yellowCards", 0.10)],
    ),
    star_entry(
        "天芮",
        Category::Inauspicious,
        &[("efficiency", -0.15), ("defense", -0.10)],
    ),
    star_entry("天沖", Category::Auspicious, &[("attack", 0.15), ("dangerousAttacks", 0.10)]),
    star_entry("天輔", Category::Auspicious, &[("passAccuracy", 0.10), ("possession", 0.05)]),
    star_entry("天禽", Category::Auspicious, &[("efficiency", 0.10)]),
    star_entry("天心", Category::Auspicious, &[("efficiency", 0.15), ("shotsOnTarget", 0.10)]),
    star_entry("天柱", Category::Inauspicious, &[("attack", -0.10), ("offsides", 0.10)]),
    star_entry("天任", Category::Auspicious, &[("defense", 0.15), ("possession", 0.05)]),
    star_entry("天英", Category::Neutral, &[("corners", 0.05), ("yellowCards", 0.05)]),
];

pub static DEITIES: [SymbolEntry; 8] = [
    deity_entry("值符", Category::Auspicious, &[("efficiency", 0.10), ("attack", 0.10)]),
    deity_entry("螣蛇", Category::Inauspicious, &[("efficiency", -0.10), ("offsides", 0.10)]),
    deity_entry("太陰", Category::Auspicious, &[("defense", 0.10)]),
    deity_entry("六合", Category::Auspicious, &[("passAccuracy", 0.10), ("possession", 0.05)]),
    deity_entry("白虎", Category::Inauspicious, &[("yellowCards", 0.20), ("fouls", 0.15)]),
    deity_entry("玄武", Category::Inauspicious, &[("defense", -0.15)]),
    deity_entry("九地", Category::Auspicious, &[("defense", 0.15), ("possession", -0.05)]),
    deity_entry("九天", Category::Auspicious, &[("attack", 0.15), ("dangerousAttacks", 0.10)]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmKind {
    DoorPressure,
    Strike,
    Void,
    Tomb,
}

impl HarmKind {
    pub const ALL: [HarmKind; 4] = [
        HarmKind::DoorPressure,
        HarmKind::Strike,
        HarmKind::Void,
        HarmKind::Tomb,
    ];

    /// Literal marker used in transcripts and as the weight-table key.
    pub fn marker(self) -> &'static str {
        match self {
            HarmKind::DoorPressure => "門迫",
            HarmKind::Strike => "擊刑",
            HarmKind::Void => "空亡",
            HarmKind::Tomb => "入墓",
        }
    }

    pub fn classify(label: &str) -> Option<HarmKind> {
        HarmKind::ALL
            .into_iter()
            .find(|kind| label.contains(kind.marker()))
    }
}

pub static HARMS: [SymbolEntry; 4] = [
    SymbolEntry {
        name: "門迫",
        kind: SymbolKind::Harm,
        category: Category::Inauspicious,
        element: None,
        impacts: &[("attack", -0.15), ("efficiency", -0.10)],
    },
    SymbolEntry {
        name: "擊刑",
        kind: SymbolKind::Harm,
        category: Category::Inauspicious,
        element: None,
        impacts: &[("yellowCards", 0.25), ("fouls", 0.20)],
    },
    SymbolEntry {
        name: "空亡",
        kind: SymbolKind::Harm,
        category: Category::Inauspicious,
        element: None,
        impacts: &[("efficiency", -0.20), ("shotsOnTarget", -0.10)],
    },
    SymbolEntry {
        name: "入墓",
        kind: SymbolKind::Harm,
        category: Category::Inauspicious,
        element: None,
        impacts: &[("attack", -0.10), ("possession", -0.10)],
    },
];

#[derive(Debug, Clone, Copy)]
pub struct PatternDef {
    pub name: &'static str,
    /// (heaven stem, earth stem) when the pattern is read off a stem pair.
    pub stems: Option<(char, char)>,
    pub category: Category,
    pub impacts: Impacts,
    pub time_sensitive: bool,
    pub energy_opportunity: bool,
}

impl PatternDef {
    /// Whether the pattern turns the whole chart into a repeat chart.
    pub fn global_repeat(&self) -> bool {
        is_global_repeat(self.name)
    }
}

const fn pattern(
    name: &'static str,
    stems: Option<(char, char)>,
    category: Category,
    impacts: Impacts,
    time_sensitive: bool,
    energy_opportunity: bool,
) -> PatternDef {
    PatternDef {
        name,
        stems,
        category,
        impacts,
        time_sensitive,
        energy_opportunity,
    }
}

pub static PATTERNS: [PatternDef; 22] = [
    pattern(
        "青龍返首",
        Some(('戊', '丙')),
        Category::Auspicious,
        &[("attack", 0.25), ("efficiency", 0.20)],
        true,
        true,
    ),
    pattern(
        "飛鳥跌穴",
        Some(('丙', '戊')),
        Category::Auspicious,
        &[("attack", 0.20), ("possession", 0.10), ("efficiency", 0.15)],
        true,
        true,
    ),
    pattern(
        "太白入熒",
        Some(('庚', '丙')),
        Category::Inauspicious,
        &[("defense", -0.20), ("efficiency", -0.15)],
        true,
        false,
    ),
    pattern(
        "熒入太白",
        Some(('丙', '庚')),
        Category::Inauspicious,
        &[("attack", -0.15), ("yellowCards", 0.20)],
        false,
        false,
    ),
    pattern(
        "螣蛇夭矯",
        Some(('癸', '丁')),
        Category::Inauspicious,
        &[("efficiency", -0.20), ("fouls", 0.15)],
        false,
        false,
    ),
    pattern(
        "朱雀投江",
        Some(('丁', '癸')),
        Category::Inauspicious,
        &[("efficiency", -0.25), ("attack", -0.10)],
        true,
        false,
    ),
    pattern(
        "白虎猖狂",
        Some(('辛', '乙')),
        Category::Inauspicious,
        &[("defense", -0.30), ("yellowCards", 0.30)],
        false,
        false,
    ),
    pattern(
        "青龍逃走",
        Some(('乙', '辛')),
        Category::Inauspicious,
        &[("attack", -0.25), ("efficiency", -0.30)],
        false,
        false,
    ),
    pattern(
        "大格",
        Some(('庚', '癸')),
        Category::Inauspicious,
        &[("attack", -0.20), ("shotsOnTarget", -0.10)],
        false,
        false,
    ),
    pattern(
        "刑格",
        Some(('庚', '己')),
        Category::Inauspicious,
        &[("yellowCards", 0.25), ("fouls", 0.20)],
        false,
        false,
    ),
    pattern(
        "伏宮格",
        Some(('庚', '戊')),
        Category::Inauspicious,
        &[("defense", -0.20), ("efficiency", -0.10)],
        false,
        false,
    ),
    pattern(
        "飛宮格",
        Some(('戊', '庚')),
        Category::Inauspicious,
        &[("possession", -0.15), ("efficiency", -0.10)],
        false,
        false,
    ),
    pattern(
        "奇儀相合",
        Some(('乙', '庚')),
        Category::Auspicious,
        &[("passAccuracy", 0.10), ("efficiency", 0.10)],
        false,
        false,
    ),
    pattern(
        "伏吟",
        None,
        Category::Inauspicious,
        &[("efficiency", -0.20), ("attack", -0.10)],
        true,
        false,
    ),
    pattern(
        "反吟",
        None,
        Category::Inauspicious,
        &[("efficiency", -0.15), ("fouls", 0.10)],
        true,
        false,
    ),
    pattern(
        "全局伏吟",
        None,
        Category::Inauspicious,
        &[("efficiency", -0.25), ("attack", -0.15)],
        true,
        false,
    ),
    pattern(
        "全局反吟",
        None,
        Category::Inauspicious,
        &[("efficiency", -0.20), ("fouls", 0.15)],
        true,
        false,
    ),
    pattern(
        "三奇得使",
        None,
        Category::Auspicious,
        &[("efficiency", 0.20), ("attack", 0.10)],
        false,
        true,
    ),
    pattern(
        "玉女守門",
        None,
        Category::Auspicious,
        &[("defense", 0.20), ("efficiency", 0.10)],
        false,
        true,
    ),
    pattern(
        "天遁",
        None,
        Category::Auspicious,
        &[("attack", 0.15), ("efficiency", 0.15)],
        false,
        true,
    ),
    pattern(
        "地遁",
        None,
        Category::Auspicious,
        &[("defense", 0.15), ("efficiency", 0.10)],
        false,
        true,
    ),
    pattern(
        "人遁",
        None,
        Category::Auspicious,
        &[("passAccuracy", 0.10), ("efficiency", 0.10)],
        false,
        true,
    ),
];

/// Patterns whose presence makes the whole chart a repeat ("吟") chart.
pub const GLOBAL_REPEAT_PATTERNS: &[&str] = &["全局伏吟", "全局反吟", "星門伏吟", "星門反吟"];

/// Patterns surfaced first in predictions and reports.
pub const IMPORTANT_PATTERNS: &[&str] = &[
    "青龍返首",
    "飛鳥跌穴",
    "青龍逃走",
    "白虎猖狂",
    "朱雀投江",
    "螣蛇夭矯",
    "太白入熒",
    "全局伏吟",
    "全局反吟",
];

pub const HEAVENLY_STEMS: [char; 10] = ['甲', '乙', '丙', '丁', '戊', '己', '庚', '辛', '壬', '癸'];

pub fn is_stem(ch: char) -> bool {
    HEAVENLY_STEMS.contains(&ch)
}

pub fn door(name: &str) -> Option<&'static SymbolEntry> {
    DOORS.iter().find(|e| e.name == name)
}

pub fn star(name: &str) -> Option<&'static SymbolEntry> {
    STARS.iter().find(|e| e.name == name)
}

pub fn deity(name: &str) -> Option<&'static SymbolEntry> {
    DEITIES.iter().find(|e| e.name == name)
}

pub fn harm(kind: HarmKind) -> &'static SymbolEntry {
    match kind {
        HarmKind::DoorPressure => &HARMS[0],
        HarmKind::Strike => &HARMS[1],
        HarmKind::Void => &HARMS[2],
        HarmKind::Tomb => &HARMS[3],
    }
}

/// First table entry whose name occurs in `text`, by position in the text.
pub fn find_symbol_in(text: &str, table: &'static [SymbolEntry]) -> Option<&'static SymbolEntry> {
    table
        .iter()
        .filter_map(|entry| text.find(entry.name).map(|pos| (pos, entry)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, entry)| entry)
}

pub fn pattern_by_stems(heaven: char, earth: char) -> Option<&'static PatternDef> {
    if heaven == earth {
        return pattern_exact("伏吟");
    }
    PATTERNS
        .iter()
        .find(|p| p.stems == Some((heaven, earth)))
}

fn pattern_exact(name: &str) -> Option<&'static PatternDef> {
    PATTERNS.iter().find(|p| p.name == name)
}

/// Exact name first, then the longest canonical name related by substring in
/// either direction (so "青龍返首格" and "返首" both resolve).
pub fn pattern_lookup(name: &str) -> Option<&'static PatternDef> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if let Some(def) = pattern_exact(name) {
        return Some(def);
    }
    PATTERNS
        .iter()
        .filter(|p| name.contains(p.name) || (name.chars().count() >= 2 && p.name.contains(name)))
        .max_by_key(|p| p.name.chars().count())
}

pub fn is_important_pattern(name: &str) -> bool {
    IMPORTANT_PATTERNS.contains(&name)
}

pub fn is_global_repeat(name: &str) -> bool {
    GLOBAL_REPEAT_PATTERNS.iter().any(|p| name.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_element_cycle_is_one_way() {
        assert!(Element::Earth.overcomes(Element::Water));
        assert!(!Element::Water.overcomes(Element::Earth));
        assert!(!Element::Wood.overcomes(Element::Wood));
    }

    #[test]
    fn fuzzy_pattern_lookup_resolves_suffixed_names() {
        assert_eq!(pattern_lookup("青龍返首格").map(|p| p.name), Some("青龍返首"));
        assert_eq!(pattern_lookup("全局伏吟").map(|p| p.name), Some("全局伏吟"));
        assert!(pattern_lookup("不存在").is_none());
        assert!(pattern_lookup("全局反吟").is_some_and(|p| p.global_repeat()));
        assert!(!pattern_lookup("伏吟").is_some_and(|p| p.global_repeat()));
    }

    #[test]
    fn identical_stems_read_as_fuyin() {
        assert_eq!(pattern_by_stems('戊', '戊').map(|p| p.name), Some("伏吟"));
        assert_eq!(pattern_by_stems('戊', '丙').map(|p| p.name), Some("青龍返首"));
        assert!(pattern_by_stems('甲', '乙').is_none());
    }

    #[test]
    fn earliest_symbol_in_text_wins() {
        let found = find_symbol_in("死門（值使） 開門", &DOORS).map(|e| e.name);
        assert_eq!(found, Some("死門"));
    }
}
