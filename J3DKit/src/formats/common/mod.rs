//! Name hashing and string table codecs

pub mod hash;
pub mod string_table;

pub use hash::{hash_archive_name, hash_name};
pub use string_table::{decode_sjis, encode_sjis, read_string_table, write_string_table};
