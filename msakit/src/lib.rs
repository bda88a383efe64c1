#[cfg(feature = "core")]
#[doc(inline)]
pub use msakit_core as core;

#[cfg(feature = "alphabet")]
#[doc(inline)]
pub use msakit_alphabet as alphabet;

#[cfg(feature = "io")]
#[doc(inline)]
pub use msakit_io as io;
