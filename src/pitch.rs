//! # Pitch Arithmetic
//!
//! Pitch classes, tonality, and enharmonic spelling.
//!
//! ## Pitch Classes
//! All pitches in a chart are stored as pitch classes: integers in [0, 11] where
//! 0 = C. `PitchClass` can only be constructed from an in-range value, so a stored
//! chord pitch is always valid. Transposition wraps modulo 12 in both directions.
//!
//! ## Spelling
//! A pitch class has no name on its own; the active key decides whether pitch
//! class 6 is "F#" or "Gb". Key spelling tables are built from the key's spelled
//! tonic by stepping letter names:
//!
//! ```text
//! distance  0   1   2   3   4   5   6   7   8   9   10  11
//! major     1   b2  2   b3  3   4   #4  5   b6  6   b7  7
//! minor     1   b2  2   3   n3  4   #4  5   6   n6  7   n7
//! ```
//!
//! The degree column picks the letter (tonic letter + degree - 1); the
//! accidental is whatever makes that letter hit the pitch. A spelling that would
//! need a double accidental moves to the neighbouring letter instead.
//!
//! ## Related Modules
//! - `catalog` - Builds the per-key spelling tables from these helpers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// A pitch class in [0, 11], 0 = C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "u8")]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);

    /// Validate a caller-supplied pitch.
    pub fn new(value: i32) -> Result<Self, ChartError> {
        if (0..12).contains(&value) {
            Ok(PitchClass(value as u8))
        } else {
            Err(ChartError::InvalidPitch { value })
        }
    }

    /// Reduce any integer modulo 12. Never fails.
    pub fn wrapping(value: i32) -> Self {
        PitchClass(value.rem_euclid(12) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Move by `semitones` in either direction, result always in [0, 11].
    pub fn transpose(self, semitones: i32) -> Self {
        Self::wrapping(self.0 as i32 + semitones)
    }

    /// Upward distance from `root` to this pitch, in [0, 11].
    pub fn distance_above(self, root: PitchClass) -> u8 {
        (self.0 as i32 - root.0 as i32).rem_euclid(12) as u8
    }

    /// Parse a note name like "C", "F#", "Bb" or "eb".
    pub fn from_name(name: &str) -> Option<Self> {
        NoteSpelling::parse(name).map(|spelling| spelling.pitch_class())
    }
}

impl TryFrom<i32> for PitchClass {
    type Error = ChartError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        PitchClass::new(value)
    }
}

impl From<PitchClass> for u8 {
    fn from(pitch: PitchClass) -> u8 {
        pitch.0
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(pitch + semitones) mod 12`, always in [0, 11] regardless of sign.
pub fn transpose_pitch(pitch: PitchClass, semitones: i32) -> PitchClass {
    pitch.transpose(semitones)
}

/// Mode of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tonality {
    #[default]
    Major,
    Minor,
}

impl fmt::Display for Tonality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tonality::Major => write!(f, "Major"),
            Tonality::Minor => write!(f, "Minor"),
        }
    }
}

/// Letter names A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

const LETTERS: [Letter; 7] = [
    Letter::C,
    Letter::D,
    Letter::E,
    Letter::F,
    Letter::G,
    Letter::A,
    Letter::B,
];

impl Letter {
    fn index(self) -> usize {
        self as usize
    }

    /// Semitones above C of the unaltered letter
    fn natural_pitch(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn step(self, steps: i32) -> Letter {
        LETTERS[(self.index() as i32 + steps).rem_euclid(7) as usize]
    }

    fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

/// A spelled note: letter plus accidental (-1 flat, +1 sharp).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSpelling {
    pub letter: Letter,
    pub accidental: i8,
}

impl NoteSpelling {
    /// Parse a letter with at most one `#` or `b`.
    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.trim().chars();
        let letter = Letter::from_char(chars.next()?)?;
        let accidental = match chars.next() {
            None => 0,
            Some('#') => 1,
            Some('b') => -1,
            Some(_) => return None,
        };
        if chars.next().is_some() {
            return None;
        }
        Some(Self { letter, accidental })
    }

    pub fn pitch_class(self) -> PitchClass {
        PitchClass::wrapping(self.letter.natural_pitch() + self.accidental as i32)
    }

    /// Spell `pitch` on `letter`, moving to a neighbouring letter when that
    /// would take a double accidental.
    fn on_letter(pitch: PitchClass, letter: Letter) -> Self {
        let accidental = signed_distance(pitch.value() as i32 - letter.natural_pitch());
        if accidental.abs() <= 1 {
            return Self {
                letter,
                accidental: accidental as i8,
            };
        }
        let neighbour = letter.step(accidental.signum());
        Self {
            letter: neighbour,
            accidental: signed_distance(pitch.value() as i32 - neighbour.natural_pitch()) as i8,
        }
    }
}

impl fmt::Display for NoteSpelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter.as_char())?;
        let symbol = if self.accidental > 0 { "#" } else { "b" };
        for _ in 0..self.accidental.unsigned_abs() {
            write!(f, "{}", symbol)?;
        }
        Ok(())
    }
}

/// Map a semitone difference into -6..=5
fn signed_distance(diff: i32) -> i32 {
    let d = diff.rem_euclid(12);
    if d > 6 {
        d - 12
    } else {
        d
    }
}

/// (letter steps above the tonic, diatonic) for each distance from the root
fn degree_table(tonality: Tonality) -> [(i32, bool); 12] {
    match tonality {
        Tonality::Major => [
            (0, true),
            (1, false),
            (1, true),
            (2, false),
            (2, true),
            (3, true),
            (3, false),
            (4, true),
            (5, false),
            (5, true),
            (6, false),
            (6, true),
        ],
        Tonality::Minor => [
            (0, true),
            (1, false),
            (1, true),
            (2, true),
            (2, false),
            (3, true),
            (3, false),
            (4, true),
            (5, true),
            (5, false),
            (6, true),
            (6, false),
        ],
    }
}

/// Spell the note `distance` semitones above a spelled tonic.
///
/// Returns the spelled name and whether the degree belongs to the scale.
pub fn spell_degree(tonic: NoteSpelling, tonality: Tonality, distance: u8) -> (String, bool) {
    let (steps, diatonic) = degree_table(tonality)[(distance % 12) as usize];
    let pitch = tonic.pitch_class().transpose(distance as i32);
    let spelling = NoteSpelling::on_letter(pitch, tonic.letter.step(steps));
    (spelling.to_string(), diatonic)
}
