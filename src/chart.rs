use serde::{Deserialize, Serialize};

use crate::symbols::{Category, Element};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PalaceKey {
    Kan,
    Kun,
    Zhen,
    Xun,
    Qian,
    Dui,
    Gen,
    Li,
}

impl PalaceKey {
    /// Slot order of `ChartRecord::palaces` (Luoshu numbering, center omitted).
    pub const ALL: [PalaceKey; 8] = [
        PalaceKey::Kan,
        PalaceKey::Kun,
        PalaceKey::Zhen,
        PalaceKey::Xun,
        PalaceKey::Qian,
        PalaceKey::Dui,
        PalaceKey::Gen,
        PalaceKey::Li,
    ];

    pub fn index(self) -> usize {
        match self {
            PalaceKey::Kan => 0,
            PalaceKey::Kun => 1,
            PalaceKey::Zhen => 2,
            PalaceKey::Xun => 3,
            PalaceKey::Qian => 4,
            PalaceKey::Dui => 5,
            PalaceKey::Gen => 6,
            PalaceKey::Li => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PalaceKey::Kan => "坎",
            PalaceKey::Kun => "坤",
            PalaceKey::Zhen => "震",
            PalaceKey::Xun => "巽",
            PalaceKey::Qian => "乾",
            PalaceKey::Dui => "兌",
            PalaceKey::Gen => "艮",
            PalaceKey::Li => "離",
        }
    }

    pub fn direction(self) -> &'static str {
        match self {
            PalaceKey::Kan => "北方",
            PalaceKey::Kun => "西南",
            PalaceKey::Zhen => "東方",
            PalaceKey::Xun => "東南",
            PalaceKey::Qian => "西北",
            PalaceKey::Dui => "西方",
            PalaceKey::Gen => "東北",
            PalaceKey::Li => "南方",
        }
    }

    pub fn element(self) -> Element {
        match self {
            PalaceKey::Kan => Element::Water,
            PalaceKey::Kun | PalaceKey::Gen => Element::Earth,
            PalaceKey::Zhen | PalaceKey::Xun => Element::Wood,
            PalaceKey::Qian | PalaceKey::Dui => Element::Metal,
            PalaceKey::Li => Element::Fire,
        }
    }

    pub fn from_char(ch: char) -> Option<PalaceKey> {
        match ch {
            '兑' => Some(PalaceKey::Dui),
            '离' => Some(PalaceKey::Li),
            _ => PalaceKey::ALL
                .into_iter()
                .find(|key| key.name().starts_with(ch)),
        }
    }

    /// Accepts "坎", "坎宮" or "坎宮(北方)".
    pub fn from_label(raw: &str) -> Option<PalaceKey> {
        raw.trim().chars().next().and_then(PalaceKey::from_char)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemPair {
    pub heaven: char,
    pub earth: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHit {
    pub name: String,
    /// Table name the hit resolved to; `None` for unknown patterns.
    pub canonical: Option<String>,
    pub category: Category,
    pub impacts: Vec<(String, f64)>,
    pub time_sensitive: bool,
    pub energy_opportunity: bool,
    /// `None` for chart-wide patterns.
    pub palace: Option<PalaceKey>,
}

impl PatternHit {
    pub fn impact(&self, field: &str) -> f64 {
        self.impacts
            .iter()
            .filter(|(name, _)| name == field)
            .map(|(_, v)| *v)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalaceRecord {
    pub key: PalaceKey,
    /// Whether the transcript contained a header for this palace.
    pub present: bool,
    pub stems: Option<StemPair>,
    pub door: Option<String>,
    pub star: Option<String>,
    pub deity: Option<String>,
    pub patterns: Vec<String>,
    pub four_harms: Vec<String>,
    #[serde(default)]
    pub synthetic_harms: Vec<String>,
    #[serde(default)]
    pub pattern_hits: Vec<PatternHit>,
}

impl PalaceRecord {
    pub fn empty(key: PalaceKey) -> Self {
        Self {
            key,
            present: false,
            stems: None,
            door: None,
            star: None,
            deity: None,
            patterns: Vec::new(),
            four_harms: Vec::new(),
            synthetic_harms: Vec::new(),
            pattern_hits: Vec::new(),
        }
    }

    pub fn add_pattern(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() && !self.patterns.contains(&name) {
            self.patterns.push(name);
        }
    }

    pub fn harms(&self) -> impl Iterator<Item = &str> {
        self.four_harms
            .iter()
            .chain(self.synthetic_harms.iter())
            .map(String::as_str)
    }

    pub fn harm_count(&self) -> usize {
        self.four_harms.len() + self.synthetic_harms.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Yang,
    Yin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dun {
    pub polarity: Polarity,
    pub number: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartMeta {
    pub solar_date: Option<String>,
    pub lunar_date: Option<String>,
    pub cycle: Option<Dun>,
    pub four_pillars: Option<String>,
    pub void_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatScope {
    Global(String),
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRecord {
    pub meta: ChartMeta,
    pub value_star: Option<String>,
    pub value_door: Option<String>,
    pub questioner: Option<PalaceKey>,
    pub opponent: Option<PalaceKey>,
    pub palaces: [PalaceRecord; 8],
    pub global_patterns: Vec<String>,
    pub repeat: RepeatScope,
    pub parsed_harm_count: usize,
    pub total_harm_count: usize,
    #[serde(default)]
    pub pattern_hits: Vec<PatternHit>,
}

impl ChartRecord {
    pub fn empty() -> Self {
        Self {
            meta: ChartMeta::default(),
            value_star: None,
            value_door: None,
            questioner: None,
            opponent: None,
            palaces: PalaceKey::ALL.map(PalaceRecord::empty),
            global_patterns: Vec::new(),
            repeat: RepeatScope::Local,
            parsed_harm_count: 0,
            total_harm_count: 0,
            pattern_hits: Vec::new(),
        }
    }

    pub fn palace(&self, key: PalaceKey) -> &PalaceRecord {
        &self.palaces[key.index()]
    }

    pub fn palace_mut(&mut self, key: PalaceKey) -> &mut PalaceRecord {
        &mut self.palaces[key.index()]
    }

    pub fn present_palaces(&self) -> impl Iterator<Item = &PalaceRecord> {
        self.palaces.iter().filter(|p| p.present)
    }

    /// Palace holding the value star ("值符" star), if it was placed.
    pub fn value_star_palace(&self) -> Option<&PalaceRecord> {
        let star = self.value_star.as_deref()?;
        self.palaces
            .iter()
            .find(|p| p.star.as_deref() == Some(star))
    }

    pub fn questioner_palace(&self) -> Option<&PalaceRecord> {
        self.questioner.map(|key| self.palace(key))
    }

    pub fn opponent_palace(&self) -> Option<&PalaceRecord> {
        self.opponent.map(|key| self.palace(key))
    }

    pub fn all_patterns(&self) -> impl Iterator<Item = &str> {
        self.palaces
            .iter()
            .flat_map(|p| p.patterns.iter())
            .chain(self.global_patterns.iter())
            .map(String::as_str)
    }

    /// Pattern hits across every palace plus chart-wide hits.
    pub fn all_pattern_hits(&self) -> impl Iterator<Item = &PatternHit> {
        self.palaces
            .iter()
            .flat_map(|p| p.pattern_hits.iter())
            .chain(self.pattern_hits.iter())
    }

    pub fn all_harms(&self) -> impl Iterator<Item = (PalaceKey, &str)> {
        self.palaces
            .iter()
            .flat_map(|p| p.harms().map(move |h| (p.key, h)))
    }
}
