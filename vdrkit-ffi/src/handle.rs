//! Opaque handle values issued by the native engine.
use std::fmt;

/// Correlation token passed through asynchronous native calls.
pub type CallbackId = i64;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// The handle value denoting "no resource".
            pub const EMPTY: Self = Self(0);

            pub fn is_empty(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle!(
    /// Handle of a prepared ledger request.
    RequestHandle
);
handle!(
    /// Handle of an open validator pool.
    PoolHandle
);
