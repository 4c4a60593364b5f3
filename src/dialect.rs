//! awk dialects and their function vocabularies
//!
//! The dialect decides which scalar functions the parser accepts and which
//! helper definitions the generator appends. Portable functions are a strict
//! subset of gawk's.

/// Aggregate function names, accepted in every dialect.
pub const AGGREGATE_FUNCTIONS: &[&str] = &["avg", "count", "max", "min", "sum", "total"];

/// Grammar keywords, never usable as identifiers.
const SQL_KEYWORDS: &[&str] = &[
    "and", "as", "distinct", "like", "limit", "not", "or", "select", "where",
];

const PORTABLE_SCALARS: &[&str] = &[
    "abs",
    "int",
    "ip_in_cidr",
    "length",
    "lower",
    "ltrim",
    "mask_ip",
    "max",
    "min",
    "replace",
    "rtrim",
    "substr",
    "trim",
    "upper",
];

const GAWK_SCALARS: &[&str] = &[
    "abs",
    "atan2",
    "cos",
    "exp",
    "int",
    "ip_in_cidr",
    "length",
    "log",
    "lower",
    "ltrim",
    "mask_ip",
    "max",
    "min",
    "rand",
    "replace",
    "rtrim",
    "sin",
    "sqrt",
    "strftime",
    "submatch",
    "substr",
    "trim",
    "upper",
];

/// Which awk the generated program targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// POSIX awk. The default.
    #[default]
    Portable,
    /// GNU awk, which adds `strftime`, `submatch`, and the math built-ins.
    Gawk,
}

impl Dialect {
    /// Scalar function names accepted by this dialect, sorted.
    pub fn scalar_functions(self) -> &'static [&'static str] {
        match self {
            Dialect::Portable => PORTABLE_SCALARS,
            Dialect::Gawk => GAWK_SCALARS,
        }
    }

    /// `name` must already be lowercase; function names are case-insensitive.
    pub fn is_scalar_function(self, name: &str) -> bool {
        self.scalar_functions().binary_search(&name).is_ok()
    }

    pub fn is_aggregate_function(self, name: &str) -> bool {
        AGGREGATE_FUNCTIONS.binary_search(&name).is_ok()
    }

    /// Reserved words: grammar keywords plus every function name this
    /// dialect accepts. Case-insensitive.
    pub fn is_reserved(self, word: &str) -> bool {
        let lower = word.to_ascii_lowercase();
        SQL_KEYWORDS.binary_search(&lower.as_str()).is_ok()
            || self.is_scalar_function(&lower)
            || self.is_aggregate_function(&lower)
    }
}
