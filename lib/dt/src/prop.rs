use alloc::{boxed::Box, vec::Vec};
use core::str;
use utils::endian::{BigEndian32, EndianData};

/// A named property with its raw, big-endian encoded value.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: Box<str>,
    pub data: Box<[u8]>,
}

impl Property {
    pub fn new(name: impl AsRef<str>, data: impl Into<Box<[u8]>>) -> Property {
        Property {
            name: Box::from(name.as_ref()),
            data: data.into(),
        }
    }

    fn leading<const N: usize>(&self) -> Result<[u8; N], PropertyError> {
        self.data
            .get(..N)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(PropertyError::InvalidPropFormat)
    }
}

impl Property {
    pub fn value_as_u32(&self) -> Result<u32, PropertyError> {
        Ok(BigEndian32::from_bytes(self.leading()?).value())
    }
    /// The first string of the value. Fails on empty or non UTF-8 data.
    pub fn value_as_str(&self) -> Result<&str, PropertyError> {
        self.value_as_strlist()?
            .into_iter()
            .next()
            .ok_or(PropertyError::InvalidPropFormat)
    }
    /// Every NUL-separated string of the value; the last one may be unterminated.
    pub fn value_as_strlist(&self) -> Result<Vec<&str>, PropertyError> {
        let data = self.data.as_ref();
        let data = data.strip_suffix(&[0u8]).unwrap_or(data);
        if data.is_empty() {
            return Ok(Vec::new());
        }
        data.split(|byte| *byte == 0)
            .map(|bytes| str::from_utf8(bytes).map_err(|_| PropertyError::InvalidPropFormat))
            .collect()
    }
    /// The value as a list of 32-bit cells. Trailing bytes that do not form a cell are rejected.
    pub fn value_as_cells(&self) -> Result<Vec<u32>, PropertyError> {
        if self.data.len() % 4 != 0 {
            return Err(PropertyError::InvalidPropFormat);
        }
        Ok(self
            .data
            .chunks_exact(4)
            .map(|chunk| BigEndian32::from_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]).value())
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    InvalidPropFormat,
    PropNotFound,
}
