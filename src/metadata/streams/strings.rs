use std::{ffi::CStr, str};

use crate::Result;

/// The `#Strings` heap: null-terminated UTF-8 identifiers.
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.3
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wraps the heap bytes.
    ///
    /// An empty slice is accepted so that a module without the heap still answers every lookup
    /// with an error instead of failing to open.
    #[must_use]
    pub fn from(data: &'a [u8]) -> Strings<'a> {
        Strings { data }
    }

    /// Returns the string at `index`. Index 0 is the empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is outside the heap, or the string is unterminated or not
    /// valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index == 0 {
            return Ok("");
        }

        let Some(tail) = self.data.get(index..) else {
            return Err(out_of_bounds_error!());
        };

        CStr::from_bytes_until_nul(tail)
            .ok()
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let data = b"\0<Module>\0System\0Object\0";
        let strings = Strings::from(data);

        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "<Module>");
        assert_eq!(strings.get(10).unwrap(), "System");
        assert_eq!(strings.get(17).unwrap(), "Object");
        assert_eq!(strings.get(19).unwrap(), "ject");
    }

    #[test]
    fn invalid() {
        let strings = Strings::from(b"\0abc");
        assert!(strings.get(1).is_err());
        assert!(strings.get(100).is_err());

        let strings = Strings::from(&[0x00, 0xFF, 0xFE, 0x00]);
        assert!(strings.get(1).is_err());
    }
}
