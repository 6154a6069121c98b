//! CAN message/signal database library
//!
//! Manages CAN signal databases: importing DBC files, converting messages
//! to and from a YAML schema, decoding live frame bytes, and generating C
//! parsing code for embedded targets.
//!
//! # Architecture
//!
//! The library is a set of pure components over a plain data model:
//! - `bitrange` converts signal positions between the linear bit offset
//!   used internally and the textual "byte.bit" tokens used by files and
//!   editors, in either of two numbering conventions
//! - `formatter` decodes raw frame bytes into engineering values
//! - `codegen` emits the C structs and parse functions an ECU would run
//! - `comment` packs/unpacks the structured comment mini-format
//! - `database` holds the imported messages, `io` reads and writes them
//!
//! No component keeps state between calls; everything is safe to use from
//! multiple threads without locking.
//!
//! # Example
//!
//! ```
//! use can_db_core::bitrange::{decode_bits, encode_bits, NumberingMode};
//! use can_db_core::formatter::format_signal;
//! use can_db_core::types::Signal;
//!
//! // a signal occupying the low nibble of the first byte
//! let (start, length) = decode_bits("1.3-1.0", NumberingMode::Native).unwrap();
//! let mut speed = Signal::new("SPEED", start, length);
//! speed.scale = 2.0;
//!
//! assert_eq!(encode_bits(start, length, NumberingMode::Native), "1.3-1.0");
//! assert_eq!(format_signal(&[0x05], &speed).to_string(), "10");
//! ```

pub mod bitrange;
pub mod codegen;
pub mod comment;
pub mod database;
pub mod formatter;
pub mod io;
pub mod types;

// Re-export main types for convenience
pub use bitrange::{encode_bits, decode_bits, endian_translate, BitAddress, NumberingMode};
pub use codegen::{export_c, CGeneratedFiles, CodegenConfig};
pub use database::{DbStats, ImportOutcome, MessageDatabase};
pub use formatter::format_signal;
pub use types::{
    Choice, Comment, CommentRecord, DbError, FormattedValue, Message, Result, Signal,
    SpecialFormula,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: empty database, known version string
        let db = MessageDatabase::new();
        assert_eq!(db.stats().num_messages, 0);
        assert!(!VERSION.is_empty());
    }
}
