//! Palette containers: a `BitStorage` of small indices plus a palette mapping them to states.
//!
//! The palette strategy only ever grows. A container starts as a single value, moves to a linear
//! list, then a hashed list, and finally stores global ids directly. Every resize builds a new
//! container, copies every cell over and replaces `self` in one assignment.

use crate::world::bit_storage::BitStorage;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::io;

/// A value stored in a palette container, with the width policy of its kind.
pub trait State: Copy + Eq + Ord + Hash + Debug {
    /// Smallest width an indirect palette uses
    const MIN_INDIRECT_BITS: u8;
    /// Widest palette still scanned linearly
    const MAX_LINEAR_BITS: u8;
    /// Widest palette before falling back to global ids
    const MAX_INDIRECT_BITS: u8;
    /// Width of a global id
    const GLOBAL_BITS: u8;

    fn from_id(id: u32) -> Self;
    fn to_id(self) -> u32;

    /// Whether `id` can be stored once the container holds global ids.
    fn fits_global(id: u32) -> bool {
        id < 1 << Self::GLOBAL_BITS
    }

    /// Maps a required width onto the widths this state kind supports.
    fn clamp_bits(bits: u8) -> u8 {
        match bits {
            0 => 0,
            b if b <= Self::MIN_INDIRECT_BITS => Self::MIN_INDIRECT_BITS,
            b if b <= Self::MAX_INDIRECT_BITS => b,
            _ => Self::GLOBAL_BITS,
        }
    }
}

/// Bits needed to tell `count` values apart.
pub fn bits_for_count(count: usize) -> u8 {
    if count <= 1 {
        0
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as u8
    }
}

fn out_of_range(id: u32, bits: u8) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("State id {} does not fit in {} bits", id, bits),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Palette<T: State> {
    Single(T),
    Linear {
        values: Vec<T>,
        bits: u8,
    },
    Hashed {
        values: Vec<T>,
        ids: HashMap<T, u32>,
        bits: u8,
    },
    Global,
}

impl<T: State> Palette<T> {
    /// Empty palette for an already clamped width. A width of 0 needs the single value.
    fn with_bits(bits: u8, single: T) -> Self {
        if bits == 0 {
            Palette::Single(single)
        } else if bits <= T::MAX_LINEAR_BITS {
            Palette::Linear {
                values: Vec::with_capacity(1 << bits),
                bits,
            }
        } else if bits <= T::MAX_INDIRECT_BITS {
            Palette::Hashed {
                values: Vec::with_capacity(1 << bits),
                ids: HashMap::new(),
                bits,
            }
        } else {
            Palette::Global
        }
    }

    fn bits(&self) -> u8 {
        match self {
            Palette::Single(_) => 0,
            Palette::Linear { bits, .. } | Palette::Hashed { bits, .. } => *bits,
            Palette::Global => T::GLOBAL_BITS,
        }
    }

    /// Index of `value`, adding it if there is room. `Err` carries the width that would fit it.
    fn id(&mut self, value: T) -> Result<u32, u8> {
        match self {
            Palette::Single(current) => {
                if *current == value {
                    Ok(0)
                } else {
                    Err(1)
                }
            }
            Palette::Linear { values, bits } => {
                if let Some(index) = values.iter().position(|v| *v == value) {
                    return Ok(index as u32);
                }
                if values.len() < 1 << *bits {
                    values.push(value);
                    Ok(values.len() as u32 - 1)
                } else {
                    Err(*bits + 1)
                }
            }
            Palette::Hashed { values, ids, bits } => {
                if let Some(index) = ids.get(&value) {
                    return Ok(*index);
                }
                if values.len() < 1 << *bits {
                    let index = values.len() as u32;
                    values.push(value);
                    ids.insert(value, index);
                    Ok(index)
                } else {
                    Err(*bits + 1)
                }
            }
            Palette::Global => Ok(value.to_id()),
        }
    }

    fn value(&self, id: u32) -> Option<T> {
        match self {
            Palette::Single(value) => (id == 0).then_some(*value),
            Palette::Linear { values, .. } | Palette::Hashed { values, .. } => {
                values.get(id as usize).copied()
            }
            Palette::Global => Some(T::from_id(id)),
        }
    }

    fn values(&self) -> Vec<T> {
        match self {
            Palette::Single(value) => vec![*value],
            Palette::Linear { values, .. } | Palette::Hashed { values, .. } => values.clone(),
            Palette::Global => Vec::new(),
        }
    }

    fn from_values(bits: u8, values: Vec<T>) -> Self {
        if bits <= T::MAX_LINEAR_BITS {
            Palette::Linear { values, bits }
        } else {
            let ids = values
                .iter()
                .enumerate()
                .map(|(i, v)| (*v, i as u32))
                .collect();
            Palette::Hashed { values, ids, bits }
        }
    }
}

/// Palette-compressed grid of `len` states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteContainer<T: State> {
    palette: Palette<T>,
    storage: BitStorage,
}

impl<T: State> PaletteContainer<T> {
    /// Container where every cell holds `value`.
    pub fn new(len: usize, value: T) -> Self {
        Self {
            palette: Palette::Single(value),
            storage: BitStorage::new(0, len),
        }
    }

    /// Rebuilds a container from a palette and packed words, picking the width from the palette
    /// size.
    pub fn with_data(len: usize, palette: Vec<T>, data: Vec<u64>) -> io::Result<Self> {
        let bits = T::clamp_bits(bits_for_count(palette.len()));
        if bits == 0 && data.is_empty() {
            if let [value] = palette.as_slice() {
                return Ok(Self::new(len, *value));
            }
        }
        Self::from_wire(bits.max(1), len, palette, data)
    }

    /// Rebuilds a container exactly as sent by the server. Widths up to the indirect limit use the
    /// palette, anything wider holds global ids.
    pub fn from_wire(bits: u8, len: usize, palette: Vec<T>, data: Vec<u64>) -> io::Result<Self> {
        if bits > T::MAX_INDIRECT_BITS {
            let storage = BitStorage::with_data(bits, len, data)?;
            if bits == T::GLOBAL_BITS {
                return Ok(Self {
                    palette: Palette::Global,
                    storage,
                });
            }
            // Repack ids sent with an unusual direct width.
            let mut packed = BitStorage::new(T::GLOBAL_BITS, len);
            for i in 0..len {
                let id = storage.get(i);
                if !T::fits_global(id) {
                    return Err(out_of_range(id, T::GLOBAL_BITS));
                }
                packed.set(i, id);
            }
            return Ok(Self {
                palette: Palette::Global,
                storage: packed,
            });
        }

        let bits = T::clamp_bits(bits.max(1));
        if palette.is_empty() || palette.len() > 1 << bits {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Palette of {} entries for {} bits", palette.len(), bits),
            ));
        }
        if let Some(value) = palette.iter().find(|v| !T::fits_global(v.to_id())) {
            return Err(out_of_range(value.to_id(), T::GLOBAL_BITS));
        }
        let storage = BitStorage::with_data(bits, len, data)?;
        if let Some(index) = (0..len).find(|i| storage.get(*i) as usize >= palette.len()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Cell {} refers to palette entry {} of {}",
                    index,
                    storage.get(index),
                    palette.len()
                ),
            ));
        }

        Ok(Self {
            palette: Palette::from_values(bits, palette),
            storage,
        })
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn bits(&self) -> u8 {
        self.palette.bits()
    }

    pub fn is_global(&self) -> bool {
        matches!(self.palette, Palette::Global)
    }

    pub fn get(&self, index: usize) -> T {
        let id = self.storage.get(index);
        // Indices are validated on decode and only written through `set`.
        self.palette.value(id).unwrap_or_else(|| T::from_id(0))
    }

    /// Stores `value` at `index`, growing the palette as needed. Fails without touching any cell
    /// when the value has no global id of `T::GLOBAL_BITS` bits.
    pub fn set(&mut self, index: usize, value: T) -> io::Result<()> {
        if !T::fits_global(value.to_id()) {
            return Err(out_of_range(value.to_id(), T::GLOBAL_BITS));
        }
        loop {
            match self.palette.id(value) {
                Ok(id) => {
                    self.storage.set(index, id);
                    return Ok(());
                }
                Err(bits) => self.grow(bits),
            }
        }
    }

    /// Replaces the container with one of at least `bits` width holding the same cells.
    fn grow(&mut self, bits: u8) {
        let bits = T::clamp_bits(bits).max(self.bits() + 1);
        let bits = if bits > T::MAX_INDIRECT_BITS {
            T::GLOBAL_BITS
        } else {
            bits
        };
        let len = self.len();
        let mut grown = Self {
            palette: Palette::with_bits(bits, self.get(0)),
            storage: BitStorage::new(bits, len),
        };
        for i in 0..len {
            let value = self.get(i);
            match grown.palette.id(value) {
                Ok(id) => grown.storage.set(i, id),
                // Cannot happen: the new palette holds at least twice as many values.
                Err(_) => return,
            }
        }
        *self = grown;
    }

    /// Palette in insertion order (empty for global ids) and the packed words.
    pub fn export(&self) -> (Vec<T>, &[u64]) {
        (self.palette.values(), self.storage.data())
    }

    /// Number of cells matching `predicate`.
    pub fn count(&self, predicate: impl Fn(T) -> bool) -> usize {
        match &self.palette {
            Palette::Single(value) => {
                if predicate(*value) {
                    self.len()
                } else {
                    0
                }
            }
            _ => (0..self.len()).filter(|i| predicate(self.get(*i))).count(),
        }
    }
}
