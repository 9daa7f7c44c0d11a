use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
};
use tracing::{error, warn};

/// Classifies what went wrong such that callers can react, e.g., by disabling a button on
/// [`ErrorKind::OutOfRange`] or by offering a retry on [`ErrorKind::Load`].
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ErrorKind {
    /// The list of image urls could not be fetched or parsed.
    Fetch,
    /// Navigation past the first or the last image or without any images.
    OutOfRange,
    /// The bytes of an image could not be fetched or decoded.
    Load,
    /// Configuration, file system, user input.
    Other,
}
impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let s = match self {
            ErrorKind::Fetch => "fetch error",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::Load => "load error",
            ErrorKind::Other => "error",
        };
        write!(f, "{s}")
    }
}

/// Error type of dogview. It is [`Clone`] since the result of one network request is shared
/// among all callers waiting for the same url.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct DvError {
    kind: ErrorKind,
    msg: String,
}
impl DvError {
    pub fn new(kind: ErrorKind, msg: &str) -> DvError {
        DvError {
            kind,
            msg: msg.to_string(),
        }
    }
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
    pub fn msg(&self) -> &str {
        &self.msg
    }
    pub fn is_out_of_range(&self) -> bool {
        self.kind == ErrorKind::OutOfRange
    }
}
impl Display for DvError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}
impl Error for DvError {}
impl From<&str> for DvError {
    fn from(value: &str) -> Self {
        DvError::new(ErrorKind::Other, value)
    }
}
/// dogview's result type with [`DvError`](DvError) as error type.
pub type DvResult<U> = Result<U, DvError>;

pub fn trace_ok_err<T, E>(x: Result<T, E>) -> Option<T>
where
    E: Debug,
{
    match x {
        Ok(x) => Some(x),
        Err(e) => {
            error!("{e:?}");
            None
        }
    }
}
pub fn trace_ok_warn<T, E>(x: Result<T, E>) -> Option<T>
where
    E: Debug,
{
    match x {
        Ok(x) => Some(x),
        Err(e) => {
            warn!("{e:?}");
            None
        }
    }
}

/// Creates a [`DvError`](DvError) of a given kind with a formatted message.
/// ```rust
/// # use std::error::Error;
/// use dvlib::{dverr, result::{DvError, ErrorKind}};
/// # fn main() -> Result<(), Box<dyn Error>> {
/// assert_eq!(
///     dverr!(Load, "some error {}", 1),
///     DvError::new(ErrorKind::Load, format!("some error {}", 1).as_str())
/// );
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! dverr {
    ($kind:ident, $s:literal) => {
        $crate::result::DvError::new($crate::result::ErrorKind::$kind, format!($s).as_str())
    };
    ($kind:ident, $s:literal, $( $exps:expr ),*) => {
        $crate::result::DvError::new(
            $crate::result::ErrorKind::$kind,
            format!($s, $($exps,)*).as_str(),
        )
    }
}

/// Wraps any debuggable error into a [`DvError`](DvError) of the given kind.
pub fn to_dv<E: Debug>(kind: ErrorKind) -> impl Fn(E) -> DvError {
    move |e| {
        DvError::new(
            kind,
            format!(
                "original error type is '{:?}', error message is '{:?}'",
                std::any::type_name::<E>(),
                e
            )
            .as_str(),
        )
    }
}

#[test]
fn test_display() {
    let e = dverr!(OutOfRange, "cannot move to {}", 3);
    assert_eq!(e.kind(), ErrorKind::OutOfRange);
    assert!(e.is_out_of_range());
    assert_eq!(e.msg(), "cannot move to 3");
    assert_eq!(format!("{e}"), "out of range: cannot move to 3");
    let e: DvError = "plain".into();
    assert_eq!(e.kind(), ErrorKind::Other);
}

#[test]
fn test_trace_ok() {
    assert_eq!(trace_ok_warn(Ok::<_, DvError>(2)), Some(2));
    assert_eq!(trace_ok_warn("x".parse::<u8>()), None);
    assert_eq!(trace_ok_err(Err::<u8, _>(dverr!(Load, "gone"))), None);
}

#[test]
fn test_to_dv() {
    let parsed = "x".parse::<u8>().map_err(to_dv(ErrorKind::Fetch));
    let e = parsed.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert!(e.msg().contains("ParseIntError"));
}
