// SPDX-License-Identifier: MIT

//! Per-batch interned string table decoder (spec §4.1).

use crate::error::DecodeError;

/// A decoded string table. Index 0 is reserved for "null/absent"; indices
/// `1..=K` correspond to entries in the order they appeared on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Vec<String>,
}

impl StringTable {
    /// Decode a flat `[len1, cp11, ..., len2, cp21, ...]` table out of the
    /// leading `size` integers of `ints`.
    ///
    /// `size` is a count of integers (not entries): the table is considered
    /// fully consumed once `size` integers have been read, however many
    /// entries that produced. Fails with `DecodeError::TableOverrun` if
    /// `size` exceeds the available buffer, or if a declared entry length
    /// would read past the `size`-integer boundary.
    pub fn decode(ints: &[i64], size: usize) -> Result<Self, DecodeError> {
        if size > ints.len() {
            return Err(DecodeError::TableOverrun);
        }
        let table = &ints[..size];
        let mut entries = Vec::new();
        let mut pos = 0usize;
        while pos < size {
            let len = *table.get(pos).ok_or(DecodeError::TableOverrun)?;
            if len < 0 {
                return Err(DecodeError::TableOverrun);
            }
            let len = len as usize;
            pos += 1;
            if pos + len > size {
                return Err(DecodeError::TableOverrun);
            }
            let mut s = String::with_capacity(len);
            for &cp in &table[pos..pos + len] {
                let ch = u32::try_from(cp)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(DecodeError::TableOverrun)?;
                s.push(ch);
            }
            entries.push(s);
            pos += len;
        }
        Ok(StringTable { entries })
    }

    /// Resolve a string id; `0` and out-of-range ids both resolve to `None`.
    pub fn get(&self, id: i64) -> Option<&str> {
        if id <= 0 {
            return None;
        }
        self.entries.get((id - 1) as usize).map(String::as_str)
    }
}
