//! Diagnostics that go to the `log` crate when the `logging` feature is
//! enabled. Without it, the arguments are only borrowed so they still count as
//! used.

macro_rules! log_at {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "logging")]
        ::log::$level!($fmt $(, $arg)*);
        #[cfg(not(feature = "logging"))]
        {
            $(let _ = &$arg;)*
        }
    }};
}

macro_rules! ldebug {
    ($($args:tt)*) => {
        $crate::log::log_at!(debug, $($args)*)
    };
}

macro_rules! ltrace {
    ($($args:tt)*) => {
        $crate::log::log_at!(trace, $($args)*)
    };
}

macro_rules! lwarn {
    ($($args:tt)*) => {
        $crate::log::log_at!(warn, $($args)*)
    };
}

pub(crate) use ldebug;
pub(crate) use log_at;
pub(crate) use ltrace;
pub(crate) use lwarn;
