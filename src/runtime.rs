//! Embedded awk runtime library
//!
//! The helper functions are a stable ABI of the generated programs: their
//! names and argument order must not change. They live in `.awk` assets
//! next to this file and are concatenated verbatim into every emitted
//! program, so the generator can reference them by name.

/// Helpers emitted into every program, portable awk.
pub const PORTABLE_LIBRARY: &str = include_str!("runtime.awk");

/// Extra helpers appended under the gawk dialect.
pub const GAWK_LIBRARY: &str = include_str!("runtime_gawk.awk");

/// Function names defined by [`PORTABLE_LIBRARY`], for ABI checks.
pub const PORTABLE_FUNCTIONS: &[&str] = &[
    "abs",
    "ltrim",
    "rtrim",
    "trim",
    "max",
    "min",
    "replace",
    "like2regex",
    "ip2bin",
    "bin2ip",
    "ip_in_cidr",
    "mask_ip",
];

/// Function names defined by [`GAWK_LIBRARY`].
pub const GAWK_FUNCTIONS: &[&str] = &["submatch"];
