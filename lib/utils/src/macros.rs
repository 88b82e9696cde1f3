//! Macros for defining thin wrapper structs around a single `inner` value.

/// Implement conversions and [core::ops::Deref] for a struct wrapping `inner: $type`.
#[macro_export]
macro_rules! impl_basic {
    ($name: ident, $type: ty) => {
        impl core::convert::From<$type> for $name {
            fn from(value: $type) -> Self {
                $name { inner: value }
            }
        }

        impl core::ops::Deref for $name {
            type Target = $type;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl $name {
            pub const fn from_const(value: $type) -> Self {
                $name { inner: value }
            }
            pub const fn into_const(self) -> $type {
                self.inner
            }
        }
    };
}

/// Implement [core::fmt::Debug] and [core::fmt::Display] as a hex number for a numeric wrapper.
#[macro_export]
macro_rules! impl_hex_fmt {
    ($name: ident) => {
        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_fmt(format_args!("{:#x}", self.inner))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_fmt(format_args!("{:#x}", self.inner))
            }
        }
    };
}
