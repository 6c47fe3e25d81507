//! Domain-level helpers with no I/O.

pub mod extract;

pub use extract::{
    first_bool, first_f64, first_string, first_timestamp, first_value, lookup, parse_timestamp,
};
