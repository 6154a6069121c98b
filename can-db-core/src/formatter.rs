//! Signal value formatter
//!
//! Turns raw frame bytes into the value a user (or a test against the
//! generated C) expects to see: raw bit extraction, two's-complement
//! correction, scale/offset, choice lookup, and the handful of custom
//! per-signal formulas.

use crate::bitrange::endian_translate;
use crate::types::{FormattedValue, Signal, SpecialFormula};

/// Extract `length` bits starting at `stream_start` from the MSB-first bit
/// stream formed by `data`.
///
/// Bits beyond the end of `data` read as 0. ECUs routinely send frames
/// shorter than the declared message length, so a truncated frame decodes
/// leniently instead of failing.
pub fn extract_raw(data: &[u8], stream_start: u32, length: u32) -> u64 {
    let mut raw: u64 = 0;

    for pos in stream_start..stream_start + length {
        let byte = (pos / 8) as usize;
        let bit = data.get(byte).map_or(0, |b| (b >> (7 - pos % 8)) & 1);
        raw = (raw << 1) | bit as u64;
    }

    raw
}

/// Round to two decimal places, matching the display precision of the
/// original tooling
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decode one signal from raw frame bytes.
///
/// The linear path extracts the raw integer, sign-corrects it, applies
/// scale and offset and rounds to two decimals; an exact choice match wins
/// over the number. Signals with a resolved custom formula bypass the
/// linear path entirely.
pub fn format_signal(data: &[u8], signal: &Signal) -> FormattedValue {
    if let Some(formula) = signal.formula {
        return apply_formula(formula, data, signal);
    }

    let raw = extract_raw(data, endian_translate(signal.start), signal.length);

    // Two's-complement correction is only defined for exact 8- and 16-bit
    // raw widths; other widths pass through uncorrected. The generated C
    // parsers share this behaviour, so widening it here would make the
    // live view disagree with firmware.
    let mut raw = raw as i64;
    if signal.is_signed {
        if signal.length == 8 && raw > 127 {
            raw -= 256;
        } else if signal.length == 16 && raw > 32767 {
            raw -= 65536;
        }
    }

    let physical = round2(raw as f64 * signal.scale + signal.offset);

    match signal.choice_for(physical) {
        Some(choice) => FormattedValue::Named(choice.name.clone()),
        None => FormattedValue::Number(physical),
    }
}

fn apply_formula(formula: SpecialFormula, data: &[u8], signal: &Signal) -> FormattedValue {
    match formula {
        SpecialFormula::ClimTemp => {
            let raw = extract_raw(data, endian_translate(signal.start), signal.length);
            FormattedValue::Text(clim_temp(raw).to_string())
        }
        SpecialFormula::Balance => {
            let pattern = bit_pattern(data, endian_translate(signal.start), signal.length);
            FormattedValue::Text(balance(&pattern).to_string())
        }
    }
}

/// The raw bits as a '0'/'1' string, for formulas keyed on bit patterns
fn bit_pattern(data: &[u8], stream_start: u32, length: u32) -> String {
    (stream_start..stream_start + length)
        .map(|pos| {
            let byte = (pos / 8) as usize;
            let bit = data.get(byte).map_or(0, |b| (b >> (7 - pos % 8)) & 1);
            if bit == 1 { '1' } else { '0' }
        })
        .collect()
}

/// Cabin temperature setpoint table. Unknown steps display as "0".
fn clim_temp(raw: u64) -> &'static str {
    match raw {
        0 => "LO",
        2 => "15",
        3 => "16",
        4 => "17",
        5 => "18",
        6 => "18.5",
        7 => "19",
        8 => "19.5",
        9 => "20",
        10 => "20.5",
        11 => "21",
        12 => "21.5",
        13 => "22",
        14 => "22.5",
        15 => "23",
        16 => "23.5",
        17 => "24",
        18 => "25",
        19 => "26",
        20 => "27",
        21 | 22 => "HI",
        _ => "0",
    }
}

/// Audio fader position, keyed on the 7-bit raw pattern. Unknown patterns
/// display as centre.
fn balance(pattern: &str) -> i32 {
    match pattern {
        "0110110" => -9,
        "0110111" => -8,
        "0111000" => -7,
        "0111001" => -6,
        "0111010" => -5,
        "0111011" => -4,
        "0111100" => -3,
        "0111101" => -2,
        "0111110" => -1,
        "0111111" => 0,
        "1000000" => 1,
        "1000001" => 2,
        "1000010" => 3,
        "1000011" => 4,
        "1000100" => 5,
        "1000101" => 6,
        "1000110" => 7,
        "1000111" => 8,
        "1001000" => 9,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Choice;

    #[test]
    fn test_extract_raw_single_byte() {
        let data = [0b1010_1100];
        // top nibble of the stream
        assert_eq!(extract_raw(&data, 0, 4), 0b1010);
        // low nibble
        assert_eq!(extract_raw(&data, 4, 4), 0b1100);
    }

    #[test]
    fn test_extract_raw_crosses_bytes() {
        let data = [0xAB, 0xCD];
        assert_eq!(extract_raw(&data, 0, 16), 0xABCD);
        assert_eq!(extract_raw(&data, 4, 8), 0xBC);
    }

    #[test]
    fn test_extract_raw_truncated_frame_reads_zero() {
        // 16 bits requested but only one byte supplied - missing bits are 0
        let data = [0xFF];
        assert_eq!(extract_raw(&data, 0, 16), 0xFF00);
        assert_eq!(extract_raw(&[], 0, 8), 0);
    }

    #[test]
    fn test_sign_correction_8_bit() {
        // full first byte: native start 7, length 8
        let mut sig = Signal::new("T_EAU", 7, 8);
        sig.is_signed = true;

        let value = format_signal(&[200], &sig);
        assert_eq!(value, FormattedValue::Number(-56.0));
    }

    #[test]
    fn test_sign_correction_16_bit() {
        let mut sig = Signal::new("COUPLE", 7, 16);
        sig.is_signed = true;

        // raw 40000 = 0x9C40
        let value = format_signal(&[0x9C, 0x40], &sig);
        assert_eq!(value, FormattedValue::Number(-25536.0));
    }

    #[test]
    fn test_no_sign_correction_for_other_widths() {
        // a 12-bit signed raw value stays uncorrected
        let mut sig = Signal::new("ODD_WIDTH", 7, 12);
        sig.is_signed = true;

        let value = format_signal(&[0xFF, 0xF0], &sig);
        assert_eq!(value, FormattedValue::Number(4095.0));
    }

    #[test]
    fn test_scale_offset_and_rounding() {
        let mut sig = Signal::new("T_EXT", 7, 8);
        sig.scale = 0.5;
        sig.offset = -40.0;

        let value = format_signal(&[101], &sig);
        assert_eq!(value, FormattedValue::Number(10.5));
    }

    #[test]
    fn test_choice_wins_over_number() {
        let mut sig = Signal::new("ETAT_GEN", 1, 2);
        sig.choices.push(Choice::new(0.0, "Off"));
        sig.choices.push(Choice::new(1.0, "On"));

        // low two bits of byte 1 = 0b01
        let value = format_signal(&[0b0000_0001], &sig);
        assert_eq!(value, FormattedValue::Named("On".into()));

        // unmatched physical value falls through to the number
        let value = format_signal(&[0b0000_0011], &sig);
        assert_eq!(value, FormattedValue::Number(3.0));
    }

    #[test]
    fn test_choice_lookup_on_scaled_value() {
        let mut sig = Signal::new("MODE", 7, 8);
        sig.scale = 2.0;
        sig.choices.push(Choice::new(4.0, "Sport"));

        let value = format_signal(&[2], &sig);
        assert_eq!(value, FormattedValue::Named("Sport".into()));
    }

    #[test]
    fn test_clim_temp_formula() {
        let mut sig = Signal::new("CONS_TEMP", 7, 8);
        sig.formula = Some(SpecialFormula::ClimTemp);

        assert_eq!(format_signal(&[0], &sig), FormattedValue::Text("LO".into()));
        assert_eq!(format_signal(&[8], &sig), FormattedValue::Text("19.5".into()));
        assert_eq!(format_signal(&[22], &sig), FormattedValue::Text("HI".into()));
        assert_eq!(format_signal(&[50], &sig), FormattedValue::Text("0".into()));
    }

    #[test]
    fn test_balance_formula() {
        // 7-bit signal in the top bits of byte 1: native start 7, length 7
        let mut sig = Signal::new("BALANCE", 7, 7);
        sig.formula = Some(SpecialFormula::Balance);

        // 0b0111111x => pattern "0111111" => centre
        assert_eq!(
            format_signal(&[0b0111_1110], &sig),
            FormattedValue::Text("0".into())
        );
        // 0b1001000x => +9
        assert_eq!(
            format_signal(&[0b1001_0000], &sig),
            FormattedValue::Text("9".into())
        );
    }
}
