//! # Key and Chord Catalog
//!
//! Static reference data consulted when spelling and rendering chords.
//!
//! ## Contents
//! - **Keys** - tonic + tonality, each with a 12-entry spelling table (`KeyNote`s)
//!   mapping `distance_from_root` to a note name
//! - **Chord types** - symbol, display template, display order
//!
//! ## Loading
//! The built-in catalog is materialised once per process and shared read-only
//! through [`Catalog::standard()`]. A custom catalog can be loaded from YAML with
//! [`Catalog::from_yaml()`]; sections left out of the YAML fall back to the
//! built-in data:
//!
//! ```yaml
//! chord_types:
//!   - symbol: maj
//!     name: Major
//!     display_template: ""
//!     display_order: 1
//! ```
//!
//! Every catalog goes through the same validation, whether built in or loaded:
//! - every key has exactly 12 notes with distinct `distance_from_root` in 0..11
//! - key slugs are unique and each key's `tone` spells its `tonic`
//! - a tonality that appears at all has exactly one key per tonic
//! - chord type symbols are unique
//!
//! A catalog that fails validation is a configuration error, reported at load
//! time rather than when some chart happens to need the missing entry.
//!
//! ## Chord Type Groups
//! Chord types are shown in two groups: the first 12 by display order, then the
//! rest. The split point is a fixed presentation rule.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::chart::Section;
use crate::error::ChartError;
use crate::pitch::{spell_degree, NoteSpelling, PitchClass, Tonality};

/// Number of chord types in the first display group
pub const CHORD_TYPE_GROUP_SIZE: usize = 12;

const MAJOR_TONES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];
const MINOR_TONES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "G#", "A", "Bb", "B",
];

// (symbol, name, display template)
const CHORD_TYPES: [(&str, &str, &str); 28] = [
    ("maj", "Major", ""),
    ("m", "Minor", "m"),
    ("7", "Dominant seventh", "7"),
    ("m7", "Minor seventh", "m7"),
    ("maj7", "Major seventh", "maj7"),
    ("6", "Sixth", "6"),
    ("m6", "Minor sixth", "m6"),
    ("sus4", "Suspended fourth", "sus4"),
    ("sus2", "Suspended second", "sus2"),
    ("dim", "Diminished", "dim"),
    ("aug", "Augmented", "+"),
    ("m7b5", "Half-diminished", "m7b5"),
    ("dim7", "Diminished seventh", "dim7"),
    ("9", "Dominant ninth", "9"),
    ("m9", "Minor ninth", "m9"),
    ("maj9", "Major ninth", "maj9"),
    ("add9", "Added ninth", "add9"),
    ("11", "Eleventh", "11"),
    ("m11", "Minor eleventh", "m11"),
    ("13", "Thirteenth", "13"),
    ("7sus4", "Seventh suspended fourth", "7sus4"),
    ("7b9", "Seventh flat nine", "7b9"),
    ("7#9", "Seventh sharp nine", "7#9"),
    ("7b5", "Seventh flat five", "7b5"),
    ("7#5", "Seventh sharp five", "7#5"),
    ("7#11", "Seventh sharp eleven", "7#11"),
    ("mmaj7", "Minor major seventh", "m(maj7)"),
    ("69", "Six nine", "6/9"),
];

/// One entry of a key's spelling table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyNote {
    pub distance_from_root: u8,
    pub name: String,
    #[serde(default)]
    pub is_diatonic: bool,
}

/// A named key with its spelling table.
///
/// After validation `notes[d].distance_from_root == d` for every `d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub slug: String,
    pub name: String,
    /// Spelled tonic, e.g. "Bb"
    pub tone: String,
    pub tonic: PitchClass,
    pub tonality: Tonality,
    pub display_order: u32,
    pub notes: Vec<KeyNote>,
}

impl Key {
    /// Build a key from its spelled tonic using the standard spelling rules.
    pub fn from_tone(tone: &str, tonality: Tonality, display_order: u32) -> Result<Key, ChartError> {
        let spelling = NoteSpelling::parse(tone)
            .ok_or_else(|| ChartError::Config(format!("'{}' is not a note name", tone)))?;
        let notes = (0..12u8)
            .map(|distance| {
                let (name, is_diatonic) = spell_degree(spelling, tonality, distance);
                KeyNote {
                    distance_from_root: distance,
                    name,
                    is_diatonic,
                }
            })
            .collect();
        let slug = format!(
            "{}-{}",
            tone.to_lowercase().replace('#', "-sharp"),
            tonality.to_string().to_lowercase()
        );
        Ok(Key {
            slug,
            name: format!("{} {}", tone, tonality),
            tone: tone.to_string(),
            tonic: spelling.pitch_class(),
            tonality,
            display_order,
            notes,
        })
    }

    /// Note name at `distance` semitones above the tonic
    pub fn note_name(&self, distance: u8) -> Option<&str> {
        self.notes
            .get(distance as usize)
            .filter(|note| note.distance_from_root == distance)
            .map(|note| note.name.as_str())
    }

    fn validated(mut self) -> Result<Key, ChartError> {
        if self.notes.len() != 12 {
            return Err(ChartError::Config(format!(
                "key '{}' has {} notes, expected 12",
                self.slug,
                self.notes.len()
            )));
        }
        self.notes.sort_by_key(|note| note.distance_from_root);
        for (expected, note) in self.notes.iter().enumerate() {
            if note.distance_from_root as usize != expected {
                return Err(ChartError::Config(format!(
                    "key '{}' has no note at distance {}",
                    self.slug, expected
                )));
            }
        }
        if PitchClass::from_name(&self.tone) != Some(self.tonic) {
            return Err(ChartError::Config(format!(
                "key '{}' tone '{}' does not spell tonic {}",
                self.slug, self.tone, self.tonic
            )));
        }
        Ok(self)
    }
}

/// A chord quality from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordType {
    pub symbol: String,
    pub name: String,
    /// Appended to the spelled root, e.g. "m7"
    pub display_template: String,
    pub display_order: u32,
}

/// Raw catalog for YAML deserialization
#[derive(Deserialize, Debug, Default)]
struct RawCatalog {
    keys: Option<Vec<Key>>,
    chord_types: Option<Vec<ChordType>>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    keys: Vec<Key>,
    chord_types: Vec<ChordType>,
}

static STANDARD: Lazy<Catalog> = Lazy::new(|| match Catalog::builtin() {
    Ok(catalog) => catalog,
    Err(e) => panic!("built-in catalog is malformed: {}", e),
});

impl Catalog {
    /// Validate and index keys and chord types.
    pub fn new(keys: Vec<Key>, chord_types: Vec<ChordType>) -> Result<Catalog, ChartError> {
        let mut keys = keys
            .into_iter()
            .map(Key::validated)
            .collect::<Result<Vec<_>, _>>()?;
        keys.sort_by_key(|key| (key.tonality, key.display_order, key.tonic));

        let mut slugs = HashSet::new();
        for key in &keys {
            if !slugs.insert(key.slug.as_str()) {
                return Err(ChartError::Config(format!("duplicate key slug '{}'", key.slug)));
            }
        }

        for tonality in [Tonality::Major, Tonality::Minor] {
            let tonics: Vec<PitchClass> = keys
                .iter()
                .filter(|key| key.tonality == tonality)
                .map(|key| key.tonic)
                .collect();
            if tonics.is_empty() {
                continue;
            }
            let distinct: HashSet<_> = tonics.iter().collect();
            if tonics.len() != 12 || distinct.len() != 12 {
                return Err(ChartError::Config(format!(
                    "{} keys must cover each of the 12 tonics exactly once",
                    tonality
                )));
            }
        }

        let mut chord_types = chord_types;
        chord_types.sort_by_key(|chord_type| chord_type.display_order);
        let mut symbols = HashSet::new();
        for chord_type in &chord_types {
            if chord_type.symbol.is_empty() {
                return Err(ChartError::Config("chord type with empty symbol".to_string()));
            }
            if !symbols.insert(chord_type.symbol.as_str()) {
                return Err(ChartError::Config(format!(
                    "duplicate chord type symbol '{}'",
                    chord_type.symbol
                )));
            }
        }

        Ok(Catalog { keys, chord_types })
    }

    /// Build the built-in catalog: 24 keys and the standard chord types.
    pub fn builtin() -> Result<Catalog, ChartError> {
        Catalog::new(builtin_keys()?, builtin_chord_types())
    }

    /// The process-wide built-in catalog.
    pub fn standard() -> &'static Catalog {
        &STANDARD
    }

    /// Load a catalog from YAML; omitted sections use the built-in data.
    pub fn from_yaml(source: &str) -> Result<Catalog, ChartError> {
        let raw: RawCatalog = serde_yaml::from_str(source)?;
        let keys = match raw.keys {
            Some(keys) => keys,
            None => builtin_keys()?,
        };
        let chord_types = raw.chord_types.unwrap_or_else(builtin_chord_types);
        Catalog::new(keys, chord_types)
    }

    /// Load a YAML catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Catalog, ChartError> {
        Catalog::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Look up a key by slug
    pub fn key(&self, slug: &str) -> Result<&Key, ChartError> {
        self.keys
            .iter()
            .find(|key| key.slug == slug)
            .ok_or_else(|| ChartError::not_found("key", slug))
    }

    pub fn key_for_tonic(&self, tonic: PitchClass, tonality: Tonality) -> Option<&Key> {
        self.keys
            .iter()
            .find(|key| key.tonic == tonic && key.tonality == tonality)
    }

    /// Key lookup that cannot fail for a validated catalog holding `tonality`.
    pub fn key_with_tonic(&self, tonic: PitchClass, tonality: Tonality) -> Result<&Key, ChartError> {
        self.key_for_tonic(tonic, tonality).ok_or_else(|| {
            ChartError::internal(format!("no {} key with tonic {} in catalog", tonality, tonic))
        })
    }

    /// Keys a chart in `tonality` can be transposed to, in display order.
    pub fn keys_with_tonality(&self, tonality: Tonality) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(move |key| key.tonality == tonality)
    }

    /// Spell `pitch` in `key`.
    pub fn spell<'a>(&self, pitch: PitchClass, key: &'a Key) -> Result<&'a str, ChartError> {
        let distance = pitch.distance_above(key.tonic);
        key.note_name(distance).ok_or_else(|| {
            ChartError::internal(format!(
                "key '{}' has no note at distance {}",
                key.slug, distance
            ))
        })
    }

    pub fn chord_types(&self) -> &[ChordType] {
        &self.chord_types
    }

    pub fn chord_type(&self, symbol: &str) -> Result<&ChordType, ChartError> {
        self.chord_types
            .iter()
            .find(|chord_type| chord_type.symbol == symbol)
            .ok_or_else(|| ChartError::not_found("chord type", symbol))
    }

    /// Chord types split into the first display group and the remainder.
    pub fn grouped(&self) -> (&[ChordType], &[ChordType]) {
        let split = CHORD_TYPE_GROUP_SIZE.min(self.chord_types.len());
        self.chord_types.split_at(split)
    }
}

/// `(chart_key.tonic + section.key_distance_from_chart) mod 12`
pub fn effective_tonic(chart_key: &Key, section: &Section) -> PitchClass {
    chart_key.tonic.transpose(section.key_distance_from_chart)
}

fn builtin_keys() -> Result<Vec<Key>, ChartError> {
    let mut keys = Vec::with_capacity(24);
    for (tonality, tones) in [(Tonality::Major, MAJOR_TONES), (Tonality::Minor, MINOR_TONES)] {
        for (i, tone) in tones.iter().enumerate() {
            keys.push(Key::from_tone(tone, tonality, i as u32 + 1)?);
        }
    }
    Ok(keys)
}

fn builtin_chord_types() -> Vec<ChordType> {
    CHORD_TYPES
        .iter()
        .enumerate()
        .map(|(i, (symbol, name, template))| ChordType {
            symbol: symbol.to_string(),
            name: name.to_string(),
            display_template: template.to_string(),
            display_order: i as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(value: i32) -> PitchClass {
        PitchClass::new(value).unwrap()
    }

    #[test]
    fn test_standard_catalog_has_24_keys() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.keys().len(), 24);
        assert_eq!(catalog.keys_with_tonality(Tonality::Major).count(), 12);
        assert_eq!(catalog.keys_with_tonality(Tonality::Minor).count(), 12);
        for key in catalog.keys() {
            assert_eq!(key.notes.len(), 12);
        }
    }

    #[test]
    fn test_key_slugs() {
        let catalog = Catalog::standard();
        let f_sharp = catalog.key("f-sharp-major").unwrap();
        assert_eq!(f_sharp.tonic, pc(6));
        assert_eq!(f_sharp.name, "F# Major");
        assert!(catalog.key("bb-minor").is_ok());
        assert!(matches!(
            catalog.key("h-major"),
            Err(ChartError::NotFound { kind: "key", .. })
        ));
    }

    #[test]
    fn test_spell_depends_on_key() {
        let catalog = Catalog::standard();
        let d_major = catalog.key("d-major").unwrap();
        let eb_major = catalog.key("eb-major").unwrap();
        assert_eq!(catalog.spell(pc(6), d_major).unwrap(), "F#");
        assert_eq!(catalog.spell(pc(6), eb_major).unwrap(), "Gb");
    }

    #[test]
    fn test_key_with_tonic() {
        let catalog = Catalog::standard();
        let key = catalog.key_with_tonic(pc(5), Tonality::Major).unwrap();
        assert_eq!(key.slug, "f-major");
        assert_eq!(key.note_name(0), Some("F"));
    }

    #[test]
    fn test_grouped_split_at_twelve() {
        let catalog = Catalog::standard();
        let (first, rest) = catalog.grouped();
        assert_eq!(first.len(), CHORD_TYPE_GROUP_SIZE);
        assert_eq!(rest.len(), catalog.chord_types().len() - 12);
        assert_eq!(first[0].symbol, "maj");
        assert_eq!(rest[0].display_order, 13);
    }

    #[test]
    fn test_major_renders_empty_suffix() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.chord_type("maj").unwrap().display_template, "");
        assert_eq!(catalog.chord_type("aug").unwrap().display_template, "+");
        assert!(catalog.chord_type("nope").is_err());
    }

    #[test]
    fn test_key_missing_note_rejected() {
        let mut key = Key::from_tone("C", Tonality::Major, 1).unwrap();
        key.notes.pop();
        let err = Catalog::new(vec![key], vec![]).unwrap_err();
        assert!(matches!(err, ChartError::Config(_)));
    }

    #[test]
    fn test_key_duplicate_distance_rejected() {
        let mut key = Key::from_tone("C", Tonality::Major, 1).unwrap();
        key.notes[11].distance_from_root = 10;
        assert!(Catalog::new(vec![key], vec![]).is_err());
    }

    #[test]
    fn test_incomplete_tonality_rejected() {
        let keys = vec![Key::from_tone("C", Tonality::Major, 1).unwrap()];
        let err = Catalog::new(keys, vec![]).unwrap_err();
        assert!(err.to_string().contains("12 tonics"));
    }

    #[test]
    fn test_duplicate_chord_symbol_rejected() {
        let mut chord_types = builtin_chord_types();
        chord_types[1].symbol = "maj".to_string();
        assert!(Catalog::new(builtin_keys().unwrap(), chord_types).is_err());
    }

    #[test]
    fn test_from_yaml_chord_types_only() {
        let yaml = r#"
chord_types:
  - symbol: maj
    name: Major
    display_template: ""
    display_order: 2
  - symbol: m
    name: Minor
    display_template: "-"
    display_order: 1
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.keys().len(), 24);
        assert_eq!(catalog.chord_types().len(), 2);
        assert_eq!(catalog.chord_types()[0].symbol, "m");
        assert_eq!(catalog.chord_type("m").unwrap().display_template, "-");
    }

    #[test]
    fn test_from_yaml_malformed() {
        assert!(matches!(
            Catalog::from_yaml("keys: [1, 2"),
            Err(ChartError::Config(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("chordchart-catalog-{}.yaml", std::process::id()));
        fs::write(&path, "chord_types:\n  - { symbol: maj, name: Major, display_template: \"\", display_order: 1 }\n").unwrap();
        let loaded = Catalog::from_path(&path);
        fs::remove_file(&path).unwrap();
        let catalog = loaded.unwrap();
        assert_eq!(catalog.chord_types().len(), 1);
        assert!(matches!(
            Catalog::from_path(std::env::temp_dir().join("chordchart-no-such-catalog.yaml")),
            Err(ChartError::Io(_))
        ));
    }

    #[test]
    fn test_effective_tonic() {
        let catalog = Catalog::standard();
        let c_major = catalog.key("c-major").unwrap();
        let section = Section {
            key_distance_from_chart: 5,
            ..Default::default()
        };
        assert_eq!(effective_tonic(c_major, &section), pc(5));
        let down = Section {
            key_distance_from_chart: -3,
            ..Default::default()
        };
        assert_eq!(effective_tonic(c_major, &down), pc(9));
    }
}
