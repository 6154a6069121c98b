//! Flat-string comment codec
//!
//! Message and signal comments travel through DBC files as a single flat
//! string, but the YAML schema stores them as a structured record. The flat
//! form packs the fields as `key:value;key:value;...`.
//!
//! Canonical dialect: keys `en`, `fr`, `src`, separated by `:`, fields
//! joined with `;`. Older files used `name_en`/`comment_en`/`comment_fr`
//! keys; those are accepted on import by stripping the `comment_` prefix
//! (`name_en` is folded into `en` when no `en` field is present).

use crate::types::{Comment, CommentRecord};

/// Structure a flat comment string into the canonical record.
///
/// A string without `;` is a bare French description. A segment that does
/// not split on `:` means the string is not in the packed dialect at all;
/// the whole input then falls back to the `fr` field rather than failing.
/// `src` overrides the source tag when given.
pub fn encode_comment(comment: &Comment, src: Option<&str>) -> CommentRecord {
    let mut record = match comment {
        Comment::Structured(record) => record.clone(),
        Comment::Plain(text) => parse_flat(text),
    };

    if let Some(src) = src {
        record.src = src.to_string();
    }

    record
}

fn parse_flat(text: &str) -> CommentRecord {
    let mut record = CommentRecord::default();

    if text.is_empty() {
        return record;
    }

    if !text.contains(';') {
        record.fr = text.to_string();
        return record;
    }

    let mut name_en = None;
    for segment in text.split(';') {
        if segment.is_empty() {
            continue;
        }

        let Some((key, value)) = segment.split_once(':') else {
            // dialect mismatch - treat the whole string as free text
            log::warn!("Comment segment '{}' has no key, keeping raw text", segment);
            return CommentRecord {
                fr: text.to_string(),
                ..CommentRecord::default()
            };
        };

        // legacy dialect keys carry a comment_ prefix
        match key.strip_prefix("comment_").unwrap_or(key) {
            "en" => record.en = value.to_string(),
            "fr" => record.fr = value.to_string(),
            "src" => record.src = value.to_string(),
            "name_en" => name_en = Some(value.to_string()),
            other => {
                log::warn!("Ignoring unknown comment key '{}'", other);
            }
        }
    }

    if record.en.is_empty() {
        if let Some(name_en) = name_en {
            record.en = name_en;
        }
    }

    record
}

/// Flatten a structured record back to the packed string form.
///
/// Empty fields are omitted. A record whose only content is the `fr` field
/// decodes to the bare text, so a plain comment survives an encode/decode
/// round trip unchanged.
pub fn decode_comment(record: &CommentRecord) -> String {
    if record.en.is_empty() && record.src.is_empty() {
        return record.fr.clone();
    }

    let mut out = String::new();
    for (key, value) in [("en", &record.en), ("fr", &record.fr), ("src", &record.src)] {
        if value.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(';');
        }
        out.push_str(key);
        out.push(':');
        out.push_str(value);
    }
    out
}

/// Flatten a [`Comment`] of either shape
pub fn comment_to_flat(comment: &Comment) -> String {
    match comment {
        Comment::Plain(text) => text.clone(),
        Comment::Structured(record) => decode_comment(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_string_becomes_fr() {
        let record = encode_comment(&Comment::Plain("Etat du moteur".into()), None);
        assert_eq!(record.fr, "Etat du moteur");
        assert_eq!(record.en, "");
        assert_eq!(record.src, "");
    }

    #[test]
    fn test_packed_string_splits_into_fields() {
        let record = encode_comment(
            &Comment::Plain("en:Engine state;fr:Etat du moteur;src:bsi".into()),
            None,
        );
        assert_eq!(record.en, "Engine state");
        assert_eq!(record.fr, "Etat du moteur");
        assert_eq!(record.src, "bsi");
    }

    #[test]
    fn test_legacy_keys_are_normalised() {
        let record = encode_comment(
            &Comment::Plain("name_en:RPM;comment_en:Engine speed;comment_fr:Regime moteur".into()),
            None,
        );
        // comment_ prefix stripped; name_en only fills an absent en
        assert_eq!(record.en, "Engine speed");
        assert_eq!(record.fr, "Regime moteur");
    }

    #[test]
    fn test_legacy_name_en_fills_missing_en() {
        let record = encode_comment(&Comment::Plain("name_en:RPM;comment_fr:Regime".into()), None);
        assert_eq!(record.en, "RPM");
        assert_eq!(record.fr, "Regime");
    }

    #[test]
    fn test_dialect_mismatch_falls_back_to_free_text() {
        let record = encode_comment(&Comment::Plain("left;right".into()), None);
        assert_eq!(record.fr, "left;right");
        assert_eq!(record.en, "");
    }

    #[test]
    fn test_src_override() {
        let record = encode_comment(&Comment::Plain("hello".into()), Some("psa_2010"));
        assert_eq!(record.fr, "hello");
        assert_eq!(record.src, "psa_2010");
    }

    #[test]
    fn test_decode_joins_nonempty_fields() {
        let record = CommentRecord {
            en: "Engine state".into(),
            fr: "Etat du moteur".into(),
            src: "bsi".into(),
        };
        assert_eq!(
            decode_comment(&record),
            "en:Engine state;fr:Etat du moteur;src:bsi"
        );
    }

    #[test]
    fn test_flat_round_trip_is_identity() {
        // flat strings with no ; or : survive encode/decode unchanged
        for raw in ["", "Etat du moteur", "simple comment"] {
            let record = encode_comment(&Comment::Plain(raw.into()), None);
            assert_eq!(decode_comment(&record), raw);
        }
    }
}
