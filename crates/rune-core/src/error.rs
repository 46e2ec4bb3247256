//! Thread-local error stack with call-site capture.
//!
//! Failures are reported through two channels: an obviously-invalid return
//! value (`None`, `false`) and, when tracking is enabled, an [`ErrRecord`]
//! pushed onto a bounded per-thread stack. Errors never unwind; the caller
//! decides whether to inspect the stack.
//!
//! The stack is intentionally bounded: once [`ERROR_STACK_MAX`] records are
//! live, newer failures are dropped silently and [`set`] reports the refusal.

use core::cell::RefCell;
use core::fmt;

use thiserror::Error;

/// Maximum depth of the per-thread error stack.
pub const ERROR_STACK_MAX: usize = 8;

/// Fixed error taxonomy, grouped by origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrCode {
    #[error("no error")]
    Ok,
    // Memory
    #[error("allocation failed")]
    AllocFailed,
    #[error("out of memory")]
    OutOfMemory,
    #[error("allocator stack overflow")]
    AllocatorStackOverflow,
    #[error("allocator stack underflow")]
    AllocatorStackUnderflow,
    // Validation
    #[error("null pointer")]
    NullPointer,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("invalid length")]
    InvalidLength,
    #[error("empty input")]
    EmptyInput,
    // Overflow
    #[error("overflow")]
    Overflow,
    #[error("buffer overflow")]
    BufferOverflow,
    #[error("length exceeded")]
    LengthExceeded,
    #[error("capacity exceeded")]
    CapacityExceeded,
    // Lookup
    #[error("not found")]
    NotFound,
    #[error("pattern not found")]
    PatternNotFound,
    #[error("index out of bounds")]
    IndexOutOfBounds,
    // Collections
    #[error("queue full")]
    QueueFull,
    #[error("queue empty")]
    QueueEmpty,
    #[error("list empty")]
    ListEmpty,
    // Formatting
    #[error("format failed")]
    FormatFailed,
    #[error("parse failed")]
    ParseFailed,
    // Text
    #[error("string too long")]
    StringTooLong,
    #[error("invalid utf-8")]
    InvalidUtf8,
}

impl ErrCode {
    /// Canonical message text for the code, as static text.
    ///
    /// Matches the `Display` rendering; kept as `&'static str` so records
    /// never need to own their message.
    pub const fn canonical(self) -> &'static str {
        match self {
            ErrCode::Ok => "no error",
            ErrCode::AllocFailed => "allocation failed",
            ErrCode::OutOfMemory => "out of memory",
            ErrCode::AllocatorStackOverflow => "allocator stack overflow",
            ErrCode::AllocatorStackUnderflow => "allocator stack underflow",
            ErrCode::NullPointer => "null pointer",
            ErrCode::InvalidArgument => "invalid argument",
            ErrCode::InvalidLength => "invalid length",
            ErrCode::EmptyInput => "empty input",
            ErrCode::Overflow => "overflow",
            ErrCode::BufferOverflow => "buffer overflow",
            ErrCode::LengthExceeded => "length exceeded",
            ErrCode::CapacityExceeded => "capacity exceeded",
            ErrCode::NotFound => "not found",
            ErrCode::PatternNotFound => "pattern not found",
            ErrCode::IndexOutOfBounds => "index out of bounds",
            ErrCode::QueueFull => "queue full",
            ErrCode::QueueEmpty => "queue empty",
            ErrCode::ListEmpty => "list empty",
            ErrCode::FormatFailed => "format failed",
            ErrCode::ParseFailed => "parse failed",
            ErrCode::StringTooLong => "string too long",
            ErrCode::InvalidUtf8 => "invalid utf-8",
        }
    }
}

/// Call site captured at the failure point.
///
/// Built by the [`site!`](crate::site) macro from `file!()`, `line!()`, and
/// the enclosing function path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub file: &'static str,
    pub line: u32,
    pub func: &'static str,
}

/// One immutable record on the error stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrRecord {
    pub code: ErrCode,
    /// Override message; `None` falls back to the code's canonical text.
    pub msg: Option<&'static str>,
    pub file: &'static str,
    pub line: u32,
    pub func: &'static str,
}

impl ErrRecord {
    /// The override message, or the code's canonical text when absent.
    pub fn message(&self) -> &'static str {
        self.msg.unwrap_or(self.code.canonical())
    }
}

impl fmt::Display for ErrRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error [{:?}]: {}\n  at {}:{} in {}()",
            self.code,
            self.message(),
            self.file,
            self.line,
            self.func
        )
    }
}

struct State {
    records: [Option<ErrRecord>; ERROR_STACK_MAX],
    depth: usize,
    enabled: bool,
}

thread_local! {
    static STATE: RefCell<State> = const {
        RefCell::new(State {
            records: [None; ERROR_STACK_MAX],
            depth: 0,
            enabled: true,
        })
    };
}

/// Captures `file!()`, `line!()`, and the enclosing function path as a
/// [`Site`](crate::error::Site).
#[macro_export]
macro_rules! site {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        let name = type_name_of(f);
        $crate::error::Site {
            file: ::core::file!(),
            line: ::core::line!(),
            func: name.strip_suffix("::f").unwrap_or(name),
        }
    }};
}

/// Records an error at the current call site.
///
/// `err_set!(code)` uses the code's canonical text; `err_set!(code, msg)`
/// attaches a static override message. Expands to [`error::set`](crate::error::set).
#[macro_export]
macro_rules! err_set {
    ($code:expr) => {
        $crate::error::set($code, None, $crate::site!())
    };
    ($code:expr, $msg:expr) => {
        $crate::error::set($code, Some($msg), $crate::site!())
    };
}

/// Pushes a record onto the stack.
///
/// Returns `false` (not recorded) when tracking is disabled or the stack is
/// already at [`ERROR_STACK_MAX`].
pub fn set(code: ErrCode, msg: Option<&'static str>, site: Site) -> bool {
    STATE.with(|s| {
        let mut s = s.borrow_mut();
        if !s.enabled || s.depth >= ERROR_STACK_MAX {
            return false;
        }
        let depth = s.depth;
        s.records[depth] = Some(ErrRecord {
            code,
            msg,
            file: site.file,
            line: site.line,
            func: site.func,
        });
        s.depth = depth + 1;
        true
    })
}

/// The top-most record, if any.
pub fn get() -> Option<ErrRecord> {
    STATE.with(|s| {
        let s = s.borrow();
        s.depth.checked_sub(1).and_then(|i| s.records[i])
    })
}

/// The top-most code, or [`ErrCode::Ok`] when the stack is empty.
pub fn code() -> ErrCode {
    get().map_or(ErrCode::Ok, |r| r.code)
}

/// The top-most message, or the "no error" sentinel text.
pub fn msg() -> &'static str {
    get().map_or(ErrCode::Ok.canonical(), |r| r.message())
}

/// Whether any record is on the stack.
pub fn has() -> bool {
    depth() > 0
}

/// Current stack depth.
pub fn depth() -> usize {
    STATE.with(|s| s.borrow().depth)
}

/// The record `i` entries below the top (`at(0) == get()`), or `None` when
/// out of range.
pub fn at(i: usize) -> Option<ErrRecord> {
    STATE.with(|s| {
        let s = s.borrow();
        s.depth.checked_sub(i + 1).and_then(|idx| s.records[idx])
    })
}

/// Drops the top-most record, if any.
pub fn pop() {
    STATE.with(|s| {
        let mut s = s.borrow_mut();
        if s.depth > 0 {
            s.depth -= 1;
        }
    });
}

/// Drops every record.
pub fn clear() {
    STATE.with(|s| s.borrow_mut().depth = 0);
}

/// Gates future [`set`] calls without discarding existing records.
pub fn enable(on: bool) {
    STATE.with(|s| s.borrow_mut().enabled = on);
}

/// Whether tracking is currently enabled.
pub fn is_enabled() -> bool {
    STATE.with(|s| s.borrow().enabled)
}

/// Renders the top-most record (or the "no error" sentinel) to `out`.
pub fn print<W: fmt::Write>(out: &mut W) -> fmt::Result {
    match get() {
        Some(r) => writeln!(out, "{r}"),
        None => writeln!(out, "Error [Ok]: no error"),
    }
}

/// Renders the whole stack top-down, each record prefixed with its index
/// below the top.
pub fn print_stack<W: fmt::Write>(out: &mut W) -> fmt::Result {
    for i in 0..depth() {
        if let Some(r) = at(i) {
            writeln!(out, "[{i}] {r}")?;
        }
    }
    Ok(())
}
