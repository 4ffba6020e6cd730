// Error handling follows the "opaque struct wrapping a private kind" layout:
// `reprosum_nostd_internal` reports failures as `&'static str` (it can't
// assume an allocator), and this crate wraps those strings plus its own
// argument-validation failures behind a single public type. The jiff crate
// has a good discussion of the tradeoffs of this shape.

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug)]
enum ErrorKind {
    /// An error that occurs when an integer lies outside of the acceptable
    /// range of values
    IntegerRange(IntegerRangeError),
    /// An error that occurs when a chunk decomposition doesn't exactly cover
    /// the input it is applied to
    PartitionLayout(PartitionLayoutError),
    /// An error that occurs within `reprosum_nostd_internal`
    Internal(InternalError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating that an integer lies outside the
    /// acceptable range of values
    pub(crate) fn integer_range(
        description: &'static str,
        actual: i64,
        min_val: i64,
        max_val: i64,
    ) -> Self {
        Error {
            kind: ErrorKind::IntegerRange(IntegerRangeError {
                description,
                actual,
                min_val,
                max_val,
            }),
        }
    }

    /// produce an error indicating that chunk lengths don't cover the input
    pub(crate) fn partition_layout(input_len: usize, covered_len: usize) -> Self {
        Error {
            kind: ErrorKind::PartitionLayout(PartitionLayoutError {
                input_len,
                covered_len,
            }),
        }
    }

    /// wraps an internal error string
    pub(crate) fn internal(message: &'static str) -> Self {
        Error {
            kind: ErrorKind::Internal(InternalError(message)),
        }
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for ErrorKind {}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::IntegerRange(ref err) => err.fmt(f),
            ErrorKind::PartitionLayout(ref err) => err.fmt(f),
            ErrorKind::Internal(ref err) => err.fmt(f),
        }
    }
}

/// An error that occurs when an integer lies outside of the acceptable
/// range of values
#[derive(Clone, Debug)]
struct IntegerRangeError {
    description: &'static str,
    actual: i64,
    min_val: i64,
    max_val: i64,
}

impl std::error::Error for IntegerRangeError {}

impl core::fmt::Display for IntegerRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has a value of {}. The value should be no less than {} and \
             not exceed {}",
            self.description, self.actual, self.min_val, self.max_val
        )
    }
}

/// An error that occurs when chunk lengths don't cover the input exactly
#[derive(Clone, Debug)]
struct PartitionLayoutError {
    input_len: usize,
    covered_len: usize,
}

impl std::error::Error for PartitionLayoutError {}

impl core::fmt::Display for PartitionLayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "the chunk lengths cover {} elements, but the input holds {}",
            self.covered_len, self.input_len
        )
    }
}

/// Wraps the string errors from `reprosum_nostd_internal`
#[derive(Clone)]
struct InternalError(&'static str);

impl std::error::Error for InternalError {}

impl core::fmt::Display for InternalError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Debug for InternalError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.0, f)
    }
}
