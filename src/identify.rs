use tracing::debug;

use crate::chart::{ChartRecord, PalaceKey, PalaceRecord, PatternHit};
use crate::symbols::{self, Category, HarmKind};

/// Augments a parsed chart with pattern descriptors and door-pressure harms.
///
/// Derived fields are rebuilt from the parsed ones on every call, so applying
/// this twice gives the same record as applying it once.
pub fn identify(chart: &ChartRecord) -> ChartRecord {
    let mut out = chart.clone();

    for palace in out.palaces.iter_mut() {
        let key = palace.key;
        palace.pattern_hits = palace
            .patterns
            .iter()
            .map(|name| pattern_hit(name, Some(key)))
            .collect();
        palace.synthetic_harms = door_pressure(palace).into_iter().collect();
    }

    out.pattern_hits = out
        .global_patterns
        .iter()
        .map(|name| pattern_hit(name, None))
        .collect();

    let synthetic: usize = out.palaces.iter().map(|p| p.synthetic_harms.len()).sum();
    out.total_harm_count = out.parsed_harm_count + synthetic;

    debug!(
        patterns = out.all_pattern_hits().count(),
        synthetic_harms = synthetic,
        total_harms = out.total_harm_count,
        "identified chart patterns"
    );
    out
}

/// Resolves a recorded pattern name against the pattern table; unknown names
/// become neutral hits with no impacts.
pub fn pattern_hit(name: &str, palace: Option<PalaceKey>) -> PatternHit {
    match symbols::pattern_lookup(name) {
        Some(def) => PatternHit {
            name: name.to_string(),
            canonical: Some(def.name.to_string()),
            category: def.category,
            impacts: def
                .impacts
                .iter()
                .map(|(field, v)| ((*field).to_string(), *v))
                .collect(),
            time_sensitive: def.time_sensitive,
            energy_opportunity: def.energy_opportunity,
            palace,
        },
        None => PatternHit {
            name: name.to_string(),
            canonical: None,
            category: Category::Neutral,
            impacts: Vec::new(),
            time_sensitive: false,
            energy_opportunity: false,
            palace,
        },
    }
}

/// `"<door>門迫"` when the palace's door element overcomes the palace element,
/// unless the transcript already listed that door's pressure.
pub fn door_pressure(palace: &PalaceRecord) -> Option<String> {
    let door_name = palace.door.as_deref()?;
    let entry = symbols::door(door_name)?;
    let element = entry.element?;
    if !element.overcomes(palace.key.element()) {
        return None;
    }
    let marker = HarmKind::DoorPressure.marker();
    let already_listed = palace
        .four_harms
        .iter()
        .any(|h| h.contains(marker) && h.contains(door_name));
    if already_listed {
        return None;
    }
    Some(format!("{door_name}{marker}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palace_with_door(key: PalaceKey, door: &str) -> PalaceRecord {
        let mut p = PalaceRecord::empty(key);
        p.present = true;
        p.door = Some(door.to_string());
        p
    }

    #[test]
    fn earth_door_presses_water_palace() {
        let p = palace_with_door(PalaceKey::Kan, "死門");
        assert_eq!(door_pressure(&p), Some("死門門迫".to_string()));
    }

    #[test]
    fn listed_pressure_is_not_duplicated() {
        let mut p = palace_with_door(PalaceKey::Kan, "生門");
        p.four_harms.push("生門門迫".to_string());
        assert_eq!(door_pressure(&p), None);
    }

    #[test]
    fn door_pressure_follows_domination_table() {
        let p = palace_with_door(PalaceKey::Li, "休門");
        // Water overcomes Fire: 休門 in 離 is pressed.
        assert!(door_pressure(&p).is_some());
        let p = palace_with_door(PalaceKey::Kan, "開門");
        assert_eq!(door_pressure(&p), None);
    }

    #[test]
    fn unknown_pattern_is_neutral() {
        let hit = pattern_hit("奇怪格", Some(PalaceKey::Kan));
        assert_eq!(hit.category, Category::Neutral);
        assert!(hit.canonical.is_none());
        assert!(hit.impacts.is_empty());
    }
}
