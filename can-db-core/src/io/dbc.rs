//! DBC file import
//!
//! Thin import over the `can-dbc` crate. The database's native bit
//! numbering coincides with the DBC bit numbering for big-endian
//! (Motorola) signals, so their start bit maps straight onto the linear
//! `start` offset. Little-endian signals cannot be represented and are
//! skipped with a warning.

use std::path::Path;

use crate::types::{Choice, Comment, DbError, Message, Result, Signal};

/// Parse a DBC file and return message definitions
pub fn parse_dbc_file(path: &Path) -> Result<Vec<Message>> {
    log::info!("Parsing DBC file: {:?}", path);

    // Read as bytes first (DBC files are frequently not UTF-8)
    let bytes = std::fs::read(path)
        .map_err(|e| DbError::DbcParseError(format!("Failed to read file {:?}: {}", path, e)))?;

    // Try UTF-8 first, then fall back to Latin-1
    let content = String::from_utf8(bytes.clone()).unwrap_or_else(|_| {
        log::warn!("DBC file is not UTF-8, trying Latin-1 encoding");
        bytes.iter().map(|&b| b as char).collect()
    });

    let dbc = can_dbc::DBC::from_slice(content.as_bytes()).map_err(|e| {
        DbError::DbcParseError(format!("Failed to parse DBC file {:?}: {:?}", path, e))
    })?;

    let mut messages = Vec::new();
    for dbc_msg in dbc.messages() {
        messages.push(convert_message(&dbc, dbc_msg));
    }

    log::info!("Parsed {} messages from {:?}", messages.len(), path);
    Ok(messages)
}

fn convert_message(dbc: &can_dbc::DBC, dbc_msg: &can_dbc::Message) -> Message {
    // Extract raw ID from the MessageId tuple struct
    let frame_id = dbc_msg.message_id().0;
    let mut message = Message::new(
        frame_id,
        dbc_msg.message_name().to_string(),
        *dbc_msg.message_size() as u32,
    );

    if let can_dbc::Transmitter::NodeName(name) = dbc_msg.transmitter() {
        message.senders.push(name.to_string());
    }
    if let Some(text) = dbc.message_comment(*dbc_msg.message_id()) {
        message.comment = Comment::Plain(text.to_string());
    }

    for dbc_sig in dbc_msg.signals() {
        match convert_signal(dbc, dbc_msg, dbc_sig) {
            Some(signal) => message.signals.push(signal),
            None => log::warn!(
                "Skipping little-endian signal '{}' in 0x{:X}",
                dbc_sig.name(),
                frame_id
            ),
        }
    }

    message
}

fn convert_signal(
    dbc: &can_dbc::DBC,
    dbc_msg: &can_dbc::Message,
    dbc_sig: &can_dbc::Signal,
) -> Option<Signal> {
    // The native numbering is the big-endian DBC numbering; Intel-order
    // signals have no representation here
    if *dbc_sig.byte_order() == can_dbc::ByteOrder::LittleEndian {
        return None;
    }

    let mut signal = Signal::new(
        dbc_sig.name().to_string(),
        *dbc_sig.start_bit() as u32,
        *dbc_sig.signal_size() as u32,
    );

    signal.scale = *dbc_sig.factor();
    signal.offset = *dbc_sig.offset();
    signal.is_signed = *dbc_sig.value_type() == can_dbc::ValueType::Signed;
    signal.minimum = Some(*dbc_sig.min());
    signal.maximum = Some(*dbc_sig.max());
    signal.unit = if dbc_sig.unit().is_empty() {
        None
    } else {
        Some(dbc_sig.unit().to_string())
    };
    signal.receivers = dbc_sig.receivers().clone();

    if let Some(text) = dbc.signal_comment(*dbc_msg.message_id(), dbc_sig.name()) {
        signal.comment = Comment::Plain(text.to_string());
    }

    // DBC value tables are keyed by raw value; choices are keyed by the
    // physical value after scale/offset
    if let Some(descriptions) =
        dbc.value_descriptions_for_signal(*dbc_msg.message_id(), dbc_sig.name())
    {
        for description in descriptions {
            let physical = *description.a() * signal.scale + signal.offset;
            signal
                .choices
                .push(Choice::new(physical, description.b().clone()));
        }
    }

    Some(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_DBC: &str = r#"
VERSION ""

NS_ :

BS_:

BU_: BSI CMB

BO_ 246 DONNEES_BSI_LENTES: 8 BSI
 SG_ T_EAU : 15|8@0+ (1,-40) [-40|215] "degC" CMB
 SG_ ETAT_GEN : 1|2@0+ (1,0) [0|3] "" CMB
 SG_ WHEEL_TICK : 16|16@1+ (1,0) [0|65535] "" CMB

VAL_ 246 ETAT_GEN 0 "Off" 1 "On" ;
"#;

    fn write_sample() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_DBC.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_simple_dbc() {
        let file = write_sample();
        let messages = parse_dbc_file(file.path()).unwrap();

        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.frame_id, 246);
        assert_eq!(msg.name, "DONNEES_BSI_LENTES");
        assert_eq!(msg.length, 8);
        assert_eq!(msg.senders, vec!["BSI".to_string()]);

        // the little-endian signal is dropped
        assert_eq!(msg.signals.len(), 2);

        let t_eau = msg.signals.iter().find(|s| s.name == "T_EAU").unwrap();
        assert_eq!((t_eau.start, t_eau.length), (15, 8));
        assert_eq!(t_eau.offset, -40.0);
        assert_eq!(t_eau.unit.as_deref(), Some("degC"));
    }

    #[test]
    fn test_value_table_becomes_physical_choices() {
        let file = write_sample();
        let messages = parse_dbc_file(file.path()).unwrap();

        let etat = messages[0]
            .signals
            .iter()
            .find(|s| s.name == "ETAT_GEN")
            .unwrap();
        assert_eq!(etat.choices.len(), 2);
        assert!(etat.choices.contains(&Choice::new(0.0, "Off")));
        assert!(etat.choices.contains(&Choice::new(1.0, "On")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = parse_dbc_file(Path::new("/nonexistent/powertrain.dbc")).unwrap_err();
        assert!(matches!(err, DbError::DbcParseError(_)));
    }
}
