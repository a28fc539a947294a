pub mod container;
pub mod record;
pub mod registry;
pub mod values;

pub use container::{RecordSet, TaggedRecord, parse_container};
pub use record::RecordValue;
pub use registry::{RecordKind, TagDescriptor};

/// Fixed bytes in front of every record value: tag, block length, value length.
pub const HEADER_LEN: usize = 16;

/// Length constraint a record value failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Exactly(usize),
    AtLeast(usize),
    MultipleOf(usize),
    Between(usize, usize),
}

impl std::fmt::Display for LengthRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
            Self::MultipleOf(n) => write!(f, "a multiple of {n}"),
            Self::Between(lo, hi) => write!(f, "between {lo} and {hi}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("value length {actual} bytes, expected {expected}")]
    Length { expected: LengthRule, actual: usize },
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),
    #[error("reserved bytes are not zero")]
    ReservedNotZero,
    #[error("unrecognized {field}: {value:#x}")]
    UnrecognizedValue { field: &'static str, value: u64 },
    #[error("{count} entries, at most {max} allowed")]
    TooManyEntries { count: u32, max: u32 },
    #[error("value truncated at offset {offset}")]
    Truncated { offset: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum TllvError {
    #[error("record header truncated at offset {offset}: {remaining} bytes left")]
    TruncatedHeader { offset: usize, remaining: usize },
    #[error(
        "tag {tag:#018x}: block of {block_len} bytes overruns container ({remaining} bytes left)"
    )]
    TruncatedBlock {
        tag: u64,
        block_len: usize,
        remaining: usize,
    },
    #[error("tag {tag:#018x}: value length {value_len} exceeds block length {block_len}")]
    ValueExceedsBlock {
        tag: u64,
        value_len: usize,
        block_len: usize,
    },
    #[error("duplicate tag {0:#018x}")]
    DuplicateTag(u64),
    #[error("{name} ({tag:#018x}): {source}")]
    Record {
        tag: u64,
        name: &'static str,
        #[source]
        source: RecordError,
    },
}
