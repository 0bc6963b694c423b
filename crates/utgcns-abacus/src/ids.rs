//! Strongly typed arena indices.
//!
//! Every cross reference inside the [`Abacus`](crate::Abacus) is a dense 32-bit index into one
//! of its arenas. Each arena gets its own newtype so a bead index can never be used to look up
//! a column. `u32::MAX` is reserved as the "unset" sentinel; [`Default`] yields it.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// The "unset" sentinel.
            pub const INVALID: Self = Self(u32::MAX);

            /// Creates an id from a raw index.
            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Creates an id for the given arena slot.
            ///
            /// # Panics
            ///
            /// Panics if `index` does not fit below the sentinel.
            #[must_use]
            pub fn from_index(index: usize) -> Self {
                match u32::try_from(index) {
                    Ok(raw) if raw != u32::MAX => Self(raw),
                    _ => panic!("{} arena overflow at index {index}", $label),
                }
            }

            /// The raw 32-bit value.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }

            /// The arena slot this id refers to.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }

            #[must_use]
            pub const fn is_invalid(self) -> bool {
                self.0 == u32::MAX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() { write!(f, "{}", self.0) } else { f.write_str("-") }
            }
        }
    };
}

arena_id!(
    /// Index of a [`Sequence`](crate::Sequence) (one ingested read).
    SeqId,
    "seq"
);
arena_id!(
    /// Index into the parallel base/quality arrays.
    BaseId,
    "base"
);
arena_id!(
    /// Index of a [`Bead`](crate::Bead).
    BeadId,
    "bead"
);
arena_id!(
    /// Index of a [`Column`](crate::Column).
    ColumnId,
    "col"
);
arena_id!(
    /// Index of a [`MultiAlign`](crate::MultiAlign).
    MultiAlignId,
    "ma"
);
