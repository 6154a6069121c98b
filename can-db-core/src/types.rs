//! Core types for the CAN database toolkit
//!
//! This module defines the signal/message model that every other component
//! consumes: the bit codec, the live-value formatter, the C code generator
//! and the YAML/DBC import-export layers. The model is deliberately plain
//! data - all behaviour lives in the component modules.

use std::fmt;

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors that can occur while importing, exporting or editing a database
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Invalid bit range: {0}")]
    InvalidBitRange(String),

    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error("Failed to parse YAML message: {0}")]
    YamlParseError(String),

    #[error("Failed to emit YAML message: {0}")]
    YamlEmitError(String),

    #[error("Message not found: CAN ID 0x{0:X}")]
    MessageNotFound(u32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A named physical value (enum-like signal interpretation)
///
/// Choices are keyed by the *physical* value after scale/offset have been
/// applied, matching the database file format.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    /// Physical value this choice matches
    pub value: f64,
    /// Display name (e.g. "Off", "Engine running")
    pub name: String,
}

impl Choice {
    pub fn new(value: f64, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }
}

/// Structured bilingual comment attached to a message or signal
///
/// The canonical dialect uses the keys `en`, `fr` and `src`, each optional
/// (empty string when absent). See the comment module for the flat-string
/// encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentRecord {
    /// English description
    pub en: String,
    /// French description (the historical primary language of the database)
    pub fr: String,
    /// Source tag (which document/tool the comment came from)
    pub src: String,
}

impl CommentRecord {
    /// True if every field is empty
    pub fn is_empty(&self) -> bool {
        self.en.is_empty() && self.fr.is_empty() && self.src.is_empty()
    }
}

/// A message or signal comment, either free text or the structured record
#[derive(Debug, Clone, PartialEq)]
pub enum Comment {
    /// Opaque free-text comment (as imported from DBC)
    Plain(String),
    /// Structured multi-field comment (the YAML schema form)
    Structured(CommentRecord),
}

impl Comment {
    /// An empty structured comment
    pub fn empty() -> Self {
        Comment::Structured(CommentRecord::default())
    }

    /// True if there is no comment content at all
    pub fn is_empty(&self) -> bool {
        match self {
            Comment::Plain(s) => s.is_empty(),
            Comment::Structured(r) => r.is_empty(),
        }
    }
}

impl Default for Comment {
    fn default() -> Self {
        Comment::empty()
    }
}

/// Per-signal custom decoder, resolved once at signal load time
///
/// A handful of signals need more than the linear scale/offset path. The
/// database tags them with a formula name; we resolve that name into a
/// variant here so the formatter never does string dispatch per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialFormula {
    /// Cabin temperature setpoint table ("LO" / 15..27 / "HI")
    ClimTemp,
    /// Audio fader position, matched on the raw bit pattern (-9..=9)
    Balance,
}

impl SpecialFormula {
    /// Resolve a formula name from the database file format.
    ///
    /// Unknown names resolve to `None` and the signal falls back to the
    /// linear path.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "e.climTemp" => Some(SpecialFormula::ClimTemp),
            "e.balance" => Some(SpecialFormula::Balance),
            _ => None,
        }
    }

    /// The database file name of this formula
    pub fn name(&self) -> &'static str {
        match self {
            SpecialFormula::ClimTemp => "e.climTemp",
            SpecialFormula::Balance => "e.balance",
        }
    }
}

/// A CAN signal definition
///
/// `start` is a 0-based linear bit offset in the native numbering of the
/// database: byte 1 is the first transmitted byte, and within a byte the
/// offset counts from its most significant end. The bitrange module
/// converts between this and the textual "byte.bit" notation.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Signal name
    pub name: String,
    /// Linear bit offset of the left-most bit of the signal
    pub start: u32,
    /// Length in bits (>= 1)
    pub length: u32,
    /// Scale factor to convert raw value to physical value
    pub scale: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// True if the raw value is two's complement
    pub is_signed: bool,
    /// Engineering unit (e.g. "km/h", "rpm")
    pub unit: Option<String>,
    /// Minimum physical value (display only)
    pub minimum: Option<f64>,
    /// Maximum physical value (display only)
    pub maximum: Option<f64>,
    /// Named physical values, empty if the signal is purely numeric
    pub choices: Vec<Choice>,
    /// Comment (free text or structured record)
    pub comment: Comment,
    /// Receiving ECU names
    pub receivers: Vec<String>,
    /// Custom decoder, if the signal needs one
    pub formula: Option<SpecialFormula>,
}

impl Signal {
    /// Create a plain unsigned signal with unit scale and no metadata
    pub fn new(name: impl Into<String>, start: u32, length: u32) -> Self {
        Self {
            name: name.into(),
            start,
            length,
            scale: 1.0,
            offset: 0.0,
            is_signed: false,
            unit: None,
            minimum: None,
            maximum: None,
            choices: Vec::new(),
            comment: Comment::empty(),
            receivers: Vec::new(),
            formula: None,
        }
    }

    /// Look up a choice by its physical value
    pub fn choice_for(&self, physical: f64) -> Option<&Choice> {
        self.choices.iter().find(|c| c.value == physical)
    }
}

/// A CAN message definition
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// CAN frame ID (unique key in the database)
    pub frame_id: u32,
    /// Message name
    pub name: String,
    /// Message length in bytes (typically <= 8)
    pub length: u32,
    /// Signals in definition order (order is significant)
    pub signals: Vec<Signal>,
    /// Sending ECU names
    pub senders: Vec<String>,
    /// Periodicity in milliseconds, if the message is cyclic
    pub cycle_time: Option<u32>,
    /// Message comment
    pub comment: Comment,
}

impl Message {
    pub fn new(frame_id: u32, name: impl Into<String>, length: u32) -> Self {
        Self {
            frame_id,
            name: name.into(),
            length,
            signals: Vec::new(),
            senders: Vec::new(),
            cycle_time: None,
            comment: Comment::empty(),
        }
    }
}

/// Output of the signal value formatter
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedValue {
    /// Physical value, rounded to two decimals
    Number(f64),
    /// Matched choice display name
    Named(String),
    /// Text produced by a custom formula (e.g. temperature setpoint "19.5")
    Text(String),
}

impl fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormattedValue::Number(v) => write!(f, "{}", v),
            FormattedValue::Named(s) => write!(f, "{}", s),
            FormattedValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Render a frame ID as uppercase hex, at least `width` digits
pub fn to_hex(raw_val: u32, width: usize) -> String {
    format!("{:0>width$X}", raw_val, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_lookup() {
        let mut sig = Signal::new("ETAT_GEN", 0, 2);
        sig.choices.push(Choice::new(0.0, "Off"));
        sig.choices.push(Choice::new(1.0, "On"));

        assert_eq!(sig.choice_for(1.0).unwrap().name, "On");
        assert!(sig.choice_for(3.0).is_none());
    }

    #[test]
    fn test_formula_resolution() {
        assert_eq!(
            SpecialFormula::from_name("e.climTemp"),
            Some(SpecialFormula::ClimTemp)
        );
        assert_eq!(
            SpecialFormula::from_name("e.balance"),
            Some(SpecialFormula::Balance)
        );
        // unknown names fall back to the linear path
        assert_eq!(SpecialFormula::from_name("e.navi"), None);
    }

    #[test]
    fn test_to_hex_width() {
        assert_eq!(to_hex(0xF6, 3), "0F6");
        assert_eq!(to_hex(0x307, 3), "307");
        assert_eq!(to_hex(0x1A2B3, 3), "1A2B3");
    }

    #[test]
    fn test_formatted_value_display() {
        assert_eq!(format!("{}", FormattedValue::Number(12.5)), "12.5");
        assert_eq!(format!("{}", FormattedValue::Named("Off".into())), "Off");
    }
}
