//! Logging shim: `trace!`/`warn!` resolve to `defmt`, `log`, or nothing.

#![allow(unused_macros, unused_imports)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        pub(crate) use defmt::{trace, warn};
    } else if #[cfg(feature = "log")] {
        pub(crate) use log::{trace, warn};
    } else {
        macro_rules! trace {
            ($($arg:tt)*) => {};
        }
        macro_rules! warn_ {
            ($($arg:tt)*) => {};
        }
        pub(crate) use trace;
        pub(crate) use warn_ as warn;
    }
}
