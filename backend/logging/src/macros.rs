//! Emission macros over the active pipeline.
//!
//! Three shapes per level:
//!
//! - `info!(a, b, c)` joins the `Display` values with single spaces
//! - `infof!("{} of {}", a, b)` formats a template
//! - `infow!("msg", "key" => value, ...)` attaches serialized fields
//!
//! `pure!` and `puref!` write through the raw channel instead. All of them
//! record the macro's call site as the entry origin.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_plain {
    ($level:ident, $($arg:expr),+ $(,)?) => {
        $crate::log(
            $crate::Level::$level,
            $crate::Joined(&[$(&$arg as &dyn ::core::fmt::Display),+]),
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_template {
    ($level:ident, $($arg:tt)+) => {
        $crate::logf($crate::Level::$level, ::core::format_args!($($arg)+))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_keyed {
    ($level:ident, $msg:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::logw(
            $crate::Level::$level,
            $msg,
            [$($crate::Field::serialized($key, &$value)),*],
        )
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:expr),+ $(,)?) => { $crate::__log_plain!(Debug, $($arg),+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:expr),+ $(,)?) => { $crate::__log_plain!(Info, $($arg),+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:expr),+ $(,)?) => { $crate::__log_plain!(Warn, $($arg),+) };
}

#[macro_export]
macro_rules! error {
    ($($arg:expr),+ $(,)?) => { $crate::__log_plain!(Error, $($arg),+) };
}

#[macro_export]
macro_rules! dpanic {
    ($($arg:expr),+ $(,)?) => { $crate::__log_plain!(DPanic, $($arg),+) };
}

/// Logs at Panic level, then panics with the message.
#[macro_export]
macro_rules! panic {
    ($($arg:expr),+ $(,)?) => { $crate::__log_plain!(Panic, $($arg),+) };
}

/// Logs at Fatal level, syncs the sinks, then exits with status 1.
#[macro_export]
macro_rules! fatal {
    ($($arg:expr),+ $(,)?) => { $crate::__log_plain!(Fatal, $($arg),+) };
}

#[macro_export]
macro_rules! debugf {
    ($($arg:tt)+) => { $crate::__log_template!(Debug, $($arg)+) };
}

#[macro_export]
macro_rules! infof {
    ($($arg:tt)+) => { $crate::__log_template!(Info, $($arg)+) };
}

#[macro_export]
macro_rules! warnf {
    ($($arg:tt)+) => { $crate::__log_template!(Warn, $($arg)+) };
}

#[macro_export]
macro_rules! errorf {
    ($($arg:tt)+) => { $crate::__log_template!(Error, $($arg)+) };
}

#[macro_export]
macro_rules! dpanicf {
    ($($arg:tt)+) => { $crate::__log_template!(DPanic, $($arg)+) };
}

#[macro_export]
macro_rules! panicf {
    ($($arg:tt)+) => { $crate::__log_template!(Panic, $($arg)+) };
}

#[macro_export]
macro_rules! fatalf {
    ($($arg:tt)+) => { $crate::__log_template!(Fatal, $($arg)+) };
}

#[macro_export]
macro_rules! debugw {
    ($($arg:tt)+) => { $crate::__log_keyed!(Debug, $($arg)+) };
}

#[macro_export]
macro_rules! infow {
    ($($arg:tt)+) => { $crate::__log_keyed!(Info, $($arg)+) };
}

#[macro_export]
macro_rules! warnw {
    ($($arg:tt)+) => { $crate::__log_keyed!(Warn, $($arg)+) };
}

#[macro_export]
macro_rules! errorw {
    ($($arg:tt)+) => { $crate::__log_keyed!(Error, $($arg)+) };
}

#[macro_export]
macro_rules! dpanicw {
    ($($arg:tt)+) => { $crate::__log_keyed!(DPanic, $($arg)+) };
}

#[macro_export]
macro_rules! panicw {
    ($($arg:tt)+) => { $crate::__log_keyed!(Panic, $($arg)+) };
}

#[macro_export]
macro_rules! fatalw {
    ($($arg:tt)+) => { $crate::__log_keyed!(Fatal, $($arg)+) };
}

/// Writes the space-joined values and a newline through the raw channel.
#[macro_export]
macro_rules! pure {
    ($($arg:expr),* $(,)?) => {
        $crate::raw::__pure(&[$(&$arg as &dyn ::core::fmt::Display),*])
    };
}

/// Writes the formatted text and a newline through the raw channel.
#[macro_export]
macro_rules! puref {
    ($($arg:tt)+) => {
        $crate::raw::__puref(::core::format_args!($($arg)+))
    };
}
