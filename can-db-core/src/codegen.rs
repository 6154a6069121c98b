//! C parser generator
//!
//! Emits the extraction code an ECU would run against a received frame: a
//! header with one struct per message plus `#define`s for every named
//! value, a source file with one `parse_*` function per message, and a
//! dispatch function switching on frame ID.
//!
//! The per-signal expression is a shift/OR chain over the touched bytes,
//! an optional binary-literal mask and right shift to isolate the field,
//! then scale and offset. The same numeric plan drives both the emitted
//! text and the consistency tests against the live formatter.

use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;

use crate::bitrange::endian_translate;
use crate::types::{Message, Signal};

/// Code generation settings (identifier prefixes, C type names)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Prefix for generated struct type names
    #[serde(default = "default_struct_prefix")]
    pub struct_prefix: String,

    /// Prefix for generated parse function names
    #[serde(default = "default_parse_prefix")]
    pub parse_prefix: String,

    /// Indentation width in spaces
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// C type names for each storage class
    #[serde(default = "default_type_u8")]
    pub type_u8: String,
    #[serde(default = "default_type_s8")]
    pub type_s8: String,
    #[serde(default = "default_type_u16")]
    pub type_u16: String,
    #[serde(default = "default_type_s16")]
    pub type_s16: String,
    #[serde(default = "default_type_u32")]
    pub type_u32: String,
    #[serde(default = "default_type_s32")]
    pub type_s32: String,
}

fn default_struct_prefix() -> String {
    "can_".to_string()
}

fn default_parse_prefix() -> String {
    "parse_".to_string()
}

fn default_tab_width() -> usize {
    4
}

fn default_type_u8() -> String {
    "uint8_t".to_string()
}

fn default_type_s8() -> String {
    "int8_t".to_string()
}

fn default_type_u16() -> String {
    "uint16_t".to_string()
}

fn default_type_s16() -> String {
    "int16_t".to_string()
}

fn default_type_u32() -> String {
    "uint32_t".to_string()
}

fn default_type_s32() -> String {
    "int32_t".to_string()
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            struct_prefix: default_struct_prefix(),
            parse_prefix: default_parse_prefix(),
            tab_width: default_tab_width(),
            type_u8: default_type_u8(),
            type_s8: default_type_s8(),
            type_u16: default_type_u16(),
            type_s16: default_type_s16(),
            type_u32: default_type_u32(),
            type_s32: default_type_s32(),
        }
    }
}

impl CodegenConfig {
    fn tab(&self) -> String {
        " ".repeat(self.tab_width)
    }

    fn struct_name(&self, message: &Message) -> String {
        format!("{}{}", self.struct_prefix, sanitize(&message.name).to_lowercase())
    }

    fn parse_fn_name(&self, message: &Message) -> String {
        format!("{}{}", self.parse_prefix, sanitize(&message.name).to_lowercase())
    }
}

/// Generated artifacts, as text. File writing is left to the caller.
#[derive(Debug, Clone)]
pub struct CGeneratedFiles {
    /// `<base>_messages.h` - struct typedefs and choice defines
    pub messages_header: String,
    /// `<base>.h` - parse function prototypes
    pub header: String,
    /// `<base>.c` - parse function bodies and the dispatch switch
    pub source: String,
}

/// Numeric description of a signal's extraction, shared by the text
/// emitter and the tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPlan {
    /// First byte index touched by the signal
    pub byte_start: u32,
    /// Last byte index touched by the signal
    pub byte_end: u32,
    /// Offset of the signal's first bit within the first byte (MSB-first)
    pub bit_in_byte_start: u32,
    /// Width in bits of the assembled byte span
    pub assembled_width: u32,
    /// Mask over the assembled value, full-width when no masking is needed
    pub mask: u64,
    /// Right shift aligning the field after masking
    pub shift: u32,
}

impl ExtractionPlan {
    /// Layout plan for one signal
    pub fn new(signal: &Signal) -> Self {
        let start = endian_translate(signal.start);
        let byte_start = start / 8;
        let byte_end = (start + signal.length - 1) / 8;
        let bit_in_byte_start = start - byte_start * 8;
        let assembled_width = 8 * (byte_end - byte_start + 1);

        let shift = assembled_width - (bit_in_byte_start + signal.length);
        let mask = if signal.length >= 64 {
            u64::MAX
        } else {
            ((1u64 << signal.length) - 1) << shift
        };

        Self {
            byte_start,
            byte_end,
            bit_in_byte_start,
            assembled_width,
            mask,
            shift,
        }
    }

    /// A byte-aligned field needs neither mask nor shift
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_in_byte_start == 0 && self.shift == 0
    }

    /// Evaluate the plan against raw bytes, exactly as the emitted C would.
    /// Bytes beyond the frame read as 0.
    pub fn evaluate_raw(&self, data: &[u8]) -> u64 {
        let mut acc: u64 = 0;
        for i in self.byte_start..=self.byte_end {
            acc = (acc << 8) | data.get(i as usize).copied().unwrap_or(0) as u64;
        }
        (acc & self.mask) >> self.shift
    }
}

/// Generate a bitmask literal: `width` binary digits with ones covering
/// `[bit, bit + length)`, counted from the most significant digit.
pub fn bitmask(bit: u32, length: u32, width: u32) -> String {
    let end = bit + length - 1;
    let mut out = String::from("0b");
    for i in 0..width {
        out.push(if i >= bit && i <= end { '1' } else { '0' });
    }
    out
}

/// Format a scale/offset constant the way a firmware author would write it
/// (no trailing `.0` on integral values)
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Replace anything that is not a C identifier character
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Build the right-hand side of the extraction assignment for one signal.
///
/// The bytes touched by the signal are assembled MSB-first with a
/// shift/OR chain, then masked and shifted down unless the field is
/// byte-aligned, then scaled and offset.
pub fn signal_expression(signal: &Signal) -> String {
    let plan = ExtractionPlan::new(signal);

    let mut assemble = String::new();
    let mut bits_left = plan.assembled_width;
    for i in plan.byte_start..plan.byte_end {
        write!(assemble, "data[{}] << {} | ", i, bits_left - 8).unwrap();
        bits_left -= 8;
    }
    write!(assemble, "data[{}]", plan.byte_end).unwrap();

    let mut suffix = String::new();
    if plan.is_byte_aligned() {
        suffix.push(')');
    } else {
        suffix.push_str(" & ");
        suffix.push_str(&bitmask(
            plan.bit_in_byte_start,
            signal.length,
            plan.assembled_width,
        ));
        if plan.shift != 0 {
            write!(suffix, ") >> {}", plan.shift).unwrap();
        } else {
            suffix.push(')');
        }
    }

    if signal.scale != 1.0 {
        write!(suffix, ") * {}", format_number(signal.scale)).unwrap();
    } else {
        suffix.push(')');
    }

    if signal.offset != 0.0 {
        if signal.offset < 0.0 {
            write!(suffix, " - {}", format_number(-signal.offset)).unwrap();
        } else {
            write!(suffix, " + {}", format_number(signal.offset)).unwrap();
        }
    }

    format!("((({}){}", assemble, suffix)
}

/// Pick the narrowest C storage type that holds the signal's physical
/// range.
///
/// The choice follows the *scaled* extremes, not the raw bit width: a
/// 6-bit signal scaled by 100 needs 16 bits of storage, and a negative
/// offset forces a signed type even on an unsigned raw field.
fn c_type<'a>(signal: &Signal, config: &'a CodegenConfig) -> &'a str {
    let (raw_min, raw_max) = raw_range(signal);
    let a = raw_min as f64 * signal.scale + signal.offset;
    let b = raw_max as f64 * signal.scale + signal.offset;
    let (phys_min, phys_max) = if a <= b { (a, b) } else { (b, a) };

    let signed = phys_min < 0.0;
    if signed {
        if phys_min >= i8::MIN as f64 && phys_max <= i8::MAX as f64 {
            &config.type_s8
        } else if phys_min >= i16::MIN as f64 && phys_max <= i16::MAX as f64 {
            &config.type_s16
        } else {
            &config.type_s32
        }
    } else if phys_max <= u8::MAX as f64 {
        &config.type_u8
    } else if phys_max <= u16::MAX as f64 {
        &config.type_u16
    } else {
        &config.type_u32
    }
}

/// Raw integer extremes of a signal, honouring the 8/16-bit two's
/// complement correction the formatter applies
fn raw_range(signal: &Signal) -> (i64, i64) {
    let unsigned_max = if signal.length >= 63 {
        i64::MAX
    } else {
        (1i64 << signal.length) - 1
    };

    if signal.is_signed {
        match signal.length {
            8 => (-128, 127),
            16 => (-32768, 32767),
            _ => (0, unsigned_max),
        }
    } else {
        (0, unsigned_max)
    }
}

/// Generate the struct/define header, prototypes header and source file
/// for the given messages.
pub fn export_c(messages: &[&Message], base_name: &str, config: &CodegenConfig) -> CGeneratedFiles {
    CGeneratedFiles {
        messages_header: generate_messages_header(messages, config),
        header: generate_header(messages, base_name, config),
        source: generate_source(messages, base_name, config),
    }
}

fn generate_messages_header(messages: &[&Message], config: &CodegenConfig) -> String {
    let tab = config.tab();
    let mut out = String::new();

    out.push_str("#include <stdint.h>\n\n");

    let mut defines = Vec::new();

    for message in messages {
        let struct_name = config.struct_name(message);
        writeln!(out, "typedef struct {}{{", struct_name).unwrap();

        for signal in &message.signals {
            for choice in &signal.choices {
                defines.push(format!(
                    "#define {}_{}    {}",
                    sanitize(&signal.name),
                    sanitize(&choice.name.to_uppercase().replace(' ', "_")),
                    format_number(choice.value)
                ));
            }

            writeln!(
                out,
                "{}{} {};",
                tab,
                c_type(signal, config),
                sanitize(&signal.name)
            )
            .unwrap();
        }

        writeln!(out, "}} {};", struct_name).unwrap();
        out.push('\n');
    }

    if !defines.is_empty() {
        for define in defines {
            out.push_str(&define);
            out.push('\n');
        }
        out.push('\n');
    }

    // one member per message, for the dispatch function
    out.push_str("typedef struct can_db {\n");
    for message in messages {
        writeln!(
            out,
            "{}{} {};",
            tab,
            config.struct_name(message),
            sanitize(&message.name).to_lowercase()
        )
        .unwrap();
    }
    out.push_str("} can_db_t;\n");

    out
}

fn generate_header(messages: &[&Message], base_name: &str, config: &CodegenConfig) -> String {
    let mut out = String::new();

    writeln!(out, "#include \"{}_messages.h\"", base_name).unwrap();
    out.push('\n');

    for message in messages {
        writeln!(
            out,
            "void {}(uint8_t* data, {}* ptr);",
            config.parse_fn_name(message),
            config.struct_name(message)
        )
        .unwrap();
    }

    out.push('\n');
    out.push_str("void can_db_dispatch(uint32_t frame_id, uint8_t* data, can_db_t* db);\n");

    out
}

fn generate_source(messages: &[&Message], base_name: &str, config: &CodegenConfig) -> String {
    let tab = config.tab();
    let mut out = String::new();

    writeln!(out, "#include \"{}.h\"", base_name).unwrap();
    out.push('\n');

    for message in messages {
        writeln!(
            out,
            "void {}(uint8_t* data, {}* ptr) {{",
            config.parse_fn_name(message),
            config.struct_name(message)
        )
        .unwrap();
        out.push('\n');

        for signal in &message.signals {
            writeln!(
                out,
                "{}ptr->{} = {};",
                tab,
                sanitize(&signal.name),
                signal_expression(signal)
            )
            .unwrap();
        }

        out.push_str("}\n\n");
    }

    out.push_str("void can_db_dispatch(uint32_t frame_id, uint8_t* data, can_db_t* db) {\n");
    writeln!(out, "{}switch (frame_id) {{", tab).unwrap();
    for message in messages {
        writeln!(out, "{}case 0x{:X}:", tab, message.frame_id).unwrap();
        writeln!(
            out,
            "{}{}{}(data, &db->{});",
            tab,
            tab,
            config.parse_fn_name(message),
            sanitize(&message.name).to_lowercase()
        )
        .unwrap();
        writeln!(out, "{}{}break;", tab, tab).unwrap();
    }
    writeln!(out, "{}}}", tab).unwrap();
    out.push_str("}\n");

    out
}
