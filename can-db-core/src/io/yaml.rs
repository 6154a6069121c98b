//! YAML message schema
//!
//! One YAML document per message. Signal positions are stored as textual
//! bit-range tokens in native numbering; structured comments are stored as
//! mappings. The YAML model below is deliberately separate from the domain
//! model, with an explicit transformation in each direction, so schema
//! quirks stay out of the core types.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;

use crate::bitrange::{decode_bits, encode_bits, NumberingMode};
use crate::comment::encode_comment;
use crate::types::{
    to_hex, Choice, Comment, CommentRecord, DbError, Message, Result, Signal, SpecialFormula,
};

/// YAML form of a message document
#[derive(Debug, Serialize, Deserialize)]
struct YamlMessage {
    id: String,
    name: String,
    length: u32,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    comment: YamlComment,
    #[serde(default)]
    periodicity: Option<u32>,
    #[serde(default)]
    senders: Vec<String>,
    #[serde(default)]
    receivers: Vec<String>,
    /// Mapping of signal name to signal body; a mapping (not a sequence)
    /// so the files read naturally, while still preserving order
    signals: Mapping,
}

fn default_kind() -> String {
    "can".to_string()
}

/// YAML form of a comment: either free text or the structured record
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum YamlComment {
    Text(String),
    Record {
        #[serde(default)]
        en: String,
        #[serde(default)]
        fr: String,
        #[serde(default)]
        src: String,
    },
}

impl Default for YamlComment {
    fn default() -> Self {
        YamlComment::Record {
            en: String::new(),
            fr: String::new(),
            src: String::new(),
        }
    }
}

impl From<YamlComment> for Comment {
    fn from(yaml: YamlComment) -> Self {
        match yaml {
            YamlComment::Text(text) => Comment::Plain(text),
            YamlComment::Record { en, fr, src } => {
                Comment::Structured(CommentRecord { en, fr, src })
            }
        }
    }
}

fn comment_to_yaml(comment: &Comment, src: Option<&str>) -> YamlComment {
    let record = encode_comment(comment, src);
    YamlComment::Record {
        en: record.en,
        fr: record.fr,
        src: record.src,
    }
}

/// YAML form of a signal body
#[derive(Debug, Serialize, Deserialize)]
struct YamlSignal {
    bits: String,
    #[serde(default)]
    comment: YamlComment,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default = "default_factor")]
    factor: f64,
    #[serde(default)]
    offset: f64,
    #[serde(default)]
    signed: bool,
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    values: Option<Mapping>,
    #[serde(default)]
    formula: Option<String>,
}

fn default_factor() -> f64 {
    1.0
}

/// Serialize a message to its YAML document
pub fn message_to_yaml(message: &Message, comment_src: Option<&str>) -> Result<String> {
    let mut signals = Mapping::new();

    for signal in &message.signals {
        let values = if signal.choices.is_empty() {
            None
        } else {
            let mut mapping = Mapping::new();
            for choice in &signal.choices {
                mapping.insert(number_key(choice.value), Value::from(choice.name.clone()));
            }
            Some(mapping)
        };

        let body = YamlSignal {
            bits: encode_bits(signal.start, signal.length, NumberingMode::Native),
            comment: comment_to_yaml(&signal.comment, None),
            min: signal.minimum,
            max: signal.maximum,
            factor: signal.scale,
            offset: signal.offset,
            signed: signal.is_signed,
            units: signal.unit.clone(),
            values,
            formula: signal.formula.map(|f| f.name().to_string()),
        };

        signals.insert(
            Value::from(signal.name.clone()),
            serde_yaml::to_value(body).map_err(|e| DbError::YamlEmitError(e.to_string()))?,
        );
    }

    // cantools-style databases keep receivers per signal; the file format
    // keeps one merged list per message
    let mut receivers: Vec<String> = Vec::new();
    for signal in &message.signals {
        for receiver in &signal.receivers {
            if !receivers.contains(receiver) {
                receivers.push(receiver.clone());
            }
        }
    }

    let doc = YamlMessage {
        id: format!("0x{}", to_hex(message.frame_id, 3)),
        name: message.name.clone(),
        length: message.length,
        kind: default_kind(),
        comment: comment_to_yaml(&message.comment, comment_src),
        periodicity: message.cycle_time,
        senders: message.senders.clone(),
        receivers,
        signals,
    };

    serde_yaml::to_string(&doc).map_err(|e| DbError::YamlEmitError(e.to_string()))
}

/// Parse a YAML document back into a message.
///
/// A signal whose bit token fails to decode is skipped with a warning; a
/// bad signal never aborts the message.
pub fn message_from_yaml(text: &str) -> Result<Message> {
    let doc: YamlMessage =
        serde_yaml::from_str(text).map_err(|e| DbError::YamlParseError(e.to_string()))?;

    let frame_id = parse_frame_id(&doc.id)?;
    let mut message = Message::new(frame_id, doc.name, doc.length);
    message.comment = doc.comment.into();
    message.cycle_time = doc.periodicity;
    message.senders = doc.senders;

    for (key, value) in doc.signals {
        let Some(name) = key.as_str().map(str::to_owned) else {
            log::warn!("Skipping signal with non-string name in 0x{:X}", frame_id);
            continue;
        };

        let body: YamlSignal = match serde_yaml::from_value(value) {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Skipping malformed signal '{}': {}", name, e);
                continue;
            }
        };

        let (start, length) = match decode_bits(&body.bits, NumberingMode::Native) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("Skipping signal '{}': {}", name, e);
                continue;
            }
        };

        let mut signal = Signal::new(name, start, length);
        signal.scale = body.factor;
        signal.offset = body.offset;
        signal.is_signed = body.signed;
        signal.unit = body.units;
        signal.minimum = body.min;
        signal.maximum = body.max;
        signal.comment = body.comment.into();
        signal.receivers = doc.receivers.clone();
        signal.choices = body.values.map(parse_choices).unwrap_or_default();
        signal.formula = body.formula.as_deref().and_then(|name| {
            let formula = SpecialFormula::from_name(name);
            if formula.is_none() {
                log::warn!("Unknown formula '{}' on '{}'", name, signal.name);
            }
            formula
        });

        message.signals.push(signal);
    }

    Ok(message)
}

/// YAML file name for a message: uppercase hex frame ID, at least 3 digits
pub fn message_file_name(frame_id: u32) -> String {
    format!("{}.yml", to_hex(frame_id, 3))
}

/// Read one message document from disk
pub fn read_message_file(path: &Path) -> Result<Message> {
    log::info!("Loading YAML message: {:?}", path);
    let text = std::fs::read_to_string(path)?;
    message_from_yaml(&text)
}

/// Write one message document into `dir`, named after its frame ID
pub fn write_message_file(dir: &Path, message: &Message, comment_src: Option<&str>) -> Result<()> {
    let path = dir.join(message_file_name(message.frame_id));
    log::info!("Exporting YAML message: {:?}", path);
    std::fs::write(&path, message_to_yaml(message, comment_src)?)?;
    Ok(())
}

fn parse_frame_id(id: &str) -> Result<u32> {
    let digits = id.trim().trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16)
        .map_err(|_| DbError::YamlParseError(format!("bad message id '{}'", id)))
}

/// Render a choice key the way the files do: integral values without a
/// decimal point
fn number_key(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn parse_choices(values: Mapping) -> Vec<Choice> {
    let mut choices = Vec::new();

    for (key, value) in values {
        let physical = match &key {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        };
        let Some(physical) = physical else {
            log::warn!("Skipping choice with non-numeric key {:?}", key);
            continue;
        };

        let name = match value {
            Value::String(s) => s,
            other => {
                log::warn!("Skipping choice {} with non-string name {:?}", physical, other);
                continue;
            }
        };

        choices.push(Choice::new(physical, name));
    }

    choices
}
