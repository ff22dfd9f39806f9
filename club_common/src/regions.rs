use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub const REGION_GROUP_PREFIX: &str = "Regio_";

/// Region marker used on events that belong to the whole club.
pub const NATIONAL: &str = "Landelijk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Utrecht")]
    Utrecht,
    #[serde(rename = "Limburg")]
    Limburg,
    #[serde(rename = "Groningen/Drenthe")]
    GroningenDrenthe,
    #[serde(rename = "Zuid-Holland")]
    ZuidHolland,
    #[serde(rename = "Noord-Holland")]
    NoordHolland,
    #[serde(rename = "Oost")]
    Oost,
    #[serde(rename = "Brabant/Zeeland")]
    BrabantZeeland,
    #[serde(rename = "Friesland")]
    Friesland,
    #[serde(rename = "Duitsland")]
    Duitsland,
}

// Spellings that show up in old spreadsheets and hand-typed profile data.
const ALIASES: &[(&str, Region)] = &[
    ("utrecht stad", Region::Utrecht),
    ("zuid limburg", Region::Limburg),
    ("noord limburg", Region::Limburg),
    ("groningen", Region::GroningenDrenthe),
    ("drenthe", Region::GroningenDrenthe),
    ("groningen en drenthe", Region::GroningenDrenthe),
    ("zh", Region::ZuidHolland),
    ("zuidholland", Region::ZuidHolland),
    ("nh", Region::NoordHolland),
    ("noordholland", Region::NoordHolland),
    ("gelderland", Region::Oost),
    ("overijssel", Region::Oost),
    ("flevoland", Region::Oost),
    ("oost nederland", Region::Oost),
    ("brabant", Region::BrabantZeeland),
    ("noord brabant", Region::BrabantZeeland),
    ("zeeland", Region::BrabantZeeland),
    ("brabant en zeeland", Region::BrabantZeeland),
    ("fryslan", Region::Friesland),
    ("frysl\u{e2}n", Region::Friesland),
    ("germany", Region::Duitsland),
    ("deutschland", Region::Duitsland),
];

impl Region {
    pub const ALL: [Region; 9] = [
        Region::Utrecht,
        Region::Limburg,
        Region::GroningenDrenthe,
        Region::ZuidHolland,
        Region::NoordHolland,
        Region::Oost,
        Region::BrabantZeeland,
        Region::Friesland,
        Region::Duitsland,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Region::Utrecht => "Utrecht",
            Region::Limburg => "Limburg",
            Region::GroningenDrenthe => "Groningen/Drenthe",
            Region::ZuidHolland => "Zuid-Holland",
            Region::NoordHolland => "Noord-Holland",
            Region::Oost => "Oost",
            Region::BrabantZeeland => "Brabant/Zeeland",
            Region::Friesland => "Friesland",
            Region::Duitsland => "Duitsland",
        }
    }

    /// Exact canonical name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Region> {
        let name = name.trim();
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }

    /// Tolerant lookup used for stored and imported data: separators, case and
    /// the known aliases all resolve to the canonical region.
    pub fn normalize(raw: &str) -> Option<Region> {
        let key = squash(raw);
        if key.is_empty() {
            return None;
        }
        Region::ALL
            .iter()
            .copied()
            .find(|r| squash(r.name()) == key)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, region)| *region)
            })
    }

    pub fn from_group(group: &str) -> Option<Region> {
        group
            .strip_prefix(REGION_GROUP_PREFIX)
            .and_then(Region::from_name)
    }

    pub fn group_name(&self) -> String {
        format!("{}{}", REGION_GROUP_PREFIX, self.name())
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub fn is_national(region: &str) -> bool {
    region.trim().eq_ignore_ascii_case(NATIONAL)
}

fn squash(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for region in Region::ALL {
            assert_eq!(Region::from_name(region.name()), Some(region));
            assert_eq!(Region::normalize(region.name()), Some(region));
        }
    }

    #[test]
    fn normalize_handles_messy_input() {
        assert_eq!(Region::normalize("  noord holland "), Some(Region::NoordHolland));
        assert_eq!(Region::normalize("NOORD_HOLLAND"), Some(Region::NoordHolland));
        assert_eq!(Region::normalize("groningen-drenthe"), Some(Region::GroningenDrenthe));
        assert_eq!(Region::normalize("Drenthe"), Some(Region::GroningenDrenthe));
        assert_eq!(Region::normalize("Gelderland"), Some(Region::Oost));
        assert_eq!(Region::normalize("Germany"), Some(Region::Duitsland));
        assert_eq!(Region::normalize(""), None);
        assert_eq!(Region::normalize("Atlantis"), None);
    }

    #[test]
    fn from_name_is_strict() {
        assert_eq!(Region::from_name("utrecht"), Some(Region::Utrecht));
        assert_eq!(Region::from_name("noord holland"), None);
    }

    #[test]
    fn group_names() {
        assert_eq!(Region::BrabantZeeland.group_name(), "Regio_Brabant/Zeeland");
        assert_eq!(Region::from_group("Regio_Friesland"), Some(Region::Friesland));
        assert_eq!(Region::from_group("Regio_All"), None);
        assert_eq!(Region::from_group("Friesland"), None);
    }

    #[test]
    fn national_marker() {
        assert!(is_national("landelijk"));
        assert!(!is_national("Utrecht"));
    }
}
