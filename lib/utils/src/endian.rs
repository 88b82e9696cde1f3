//! ## Endianness Module
//! This module provides some structs to better resolve the data in specific endianness rules
//!
//! All the types declared here implements [EndianData<T>],
//! which defines [EndianData<T>::value] function to parse the data into the endianness of the current arch

///[u32] in Big Endianness
#[derive(Debug, Clone, Copy)]
pub struct BigEndian32(u32);

/// This trait defines a packed data in memory with some specific endianness.
pub trait EndianData<T>: Copy + Clone {
    /// Parse the value into the endianness of the current architecture.
    fn value(&self) -> T;
}

/// Implement an [EndianData<T>] for a specific type, and explain the data in big endianess
macro_rules! impl_converter_big {
    ($type: tt, $tval: tt, $width: expr) => {
        impl EndianData<$tval> for $type {
            #[inline(always)]
            fn value(&self) -> $tval {
                $tval::from_be(self.0)
            }
        }

        impl $type {
            /// Reinterpret raw bytes, as laid out in memory, as a big-endian value.
            #[inline(always)]
            pub const fn from_bytes(bytes: [u8; $width]) -> $type {
                $type($tval::from_ne_bytes(bytes))
            }

            /// Store a native value in big-endian layout.
            #[inline(always)]
            pub const fn new(value: $tval) -> $type {
                $type(value.to_be())
            }

            /// The bytes as they are laid out in memory.
            #[inline(always)]
            pub const fn to_bytes(self) -> [u8; $width] {
                self.0.to_ne_bytes()
            }
        }
    };
}

impl_converter_big!(BigEndian32, u32, 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_memory_layout_as_big_endian() {
        assert_eq!(BigEndian32::from_bytes([0x12, 0x34, 0x56, 0x78]).value(), 0x1234_5678);
        assert_eq!(BigEndian32::new(0xa000_0000).to_bytes(), [0xa0, 0, 0, 0]);
    }
}
