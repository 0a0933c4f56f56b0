//! Bit-field descriptors over register payloads.
//!
//! Every register field is described by an [`Item`]: the byte offset of the
//! big-endian 32-bit word that holds it, the bit position of its least
//! significant bit inside that word, and its width. Reads mask the value to
//! the field width; writes clear exactly the field's bits before inserting
//! the masked value, so adjacent fields sharing a word are never disturbed.
//!
//! ```
//! use linecard_protocol::item::Item;
//!
//! const SLOT_INDEX: Item = Item::new("slot_index", 0x00, 0, 4);
//! const QUERY_KIND: Item = Item::new("query_kind", 0x00, 16, 8);
//!
//! let mut buf = [0u8; 4];
//! SLOT_INDEX.set(&mut buf, 0x1f); // only the low 4 bits survive
//! QUERY_KIND.set(&mut buf, 0x01);
//!
//! assert_eq!(SLOT_INDEX.get(&buf), 0x0f);
//! assert_eq!(QUERY_KIND.get(&buf), 0x01);
//! assert_eq!(buf, [0x00, 0x01, 0x00, 0x0f]);
//! ```
//!
//! Payloads must be at least `offset + 4` bytes long; the register codecs
//! check the payload length once before touching any item.

/// A fixed bit-field inside a big-endian 32-bit register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Field name, used in diagnostics.
    pub name: &'static str,

    /// Byte offset of the 32-bit word holding the field.
    pub offset: usize,

    /// Bit position of the field's least significant bit.
    pub shift: u8,

    /// Field width in bits (1-32).
    pub width: u8,
}

impl Item {
    /// Describe a field. `shift + width` must not exceed 32.
    pub const fn new(name: &'static str, offset: usize, shift: u8, width: u8) -> Self {
        assert!(width >= 1 && width <= 32, "item width must be 1-32 bits");
        assert!(shift as u32 + width as u32 <= 32, "item exceeds its 32-bit word");
        Self {
            name,
            offset,
            shift,
            width,
        }
    }

    /// Mask of the field's value bits, before shifting.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        if self.width == 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Largest value the field can hold.
    #[must_use]
    pub const fn max_value(&self) -> u32 {
        self.mask()
    }

    /// Read the field from `buf`.
    #[must_use]
    pub fn get(&self, buf: &[u8]) -> u32 {
        (self.read_word(buf) >> self.shift) & self.mask()
    }

    /// Read a 1-bit field as a flag.
    #[must_use]
    pub fn get_bool(&self, buf: &[u8]) -> bool {
        self.get(buf) != 0
    }

    /// Write `value` into the field, truncating it to the field width.
    pub fn set(&self, buf: &mut [u8], value: u32) {
        let field_mask = self.mask() << self.shift;
        let word = (self.read_word(buf) & !field_mask) | ((value << self.shift) & field_mask);
        buf[self.offset..self.offset + 4].copy_from_slice(&word.to_be_bytes());
    }

    /// Write a flag into a 1-bit field.
    pub fn set_bool(&self, buf: &mut [u8], value: bool) {
        self.set(buf, u32::from(value));
    }

    fn read_word(&self, buf: &[u8]) -> u32 {
        let o = self.offset;
        u32::from_be_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]])
    }
}

/// A big-endian array of 1-bit elements.
///
/// Element 0 is the least significant bit of the *last* byte of the array;
/// element `8 * len - 1` is the most significant bit of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitArray {
    /// Field name, used in diagnostics.
    pub name: &'static str,

    /// Byte offset of the first byte of the array.
    pub offset: usize,

    /// Array length in bytes.
    pub len: usize,
}

impl BitArray {
    pub const fn new(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len }
    }

    /// Number of addressable bits.
    #[must_use]
    pub const fn bit_count(&self) -> usize {
        self.len * 8
    }

    /// Byte position and shift of element `index`, relative to the array start.
    #[must_use]
    pub const fn locate(&self, index: usize) -> (usize, u8) {
        let be_index = self.bit_count() - 1 - index;
        (be_index / 8, (index % 8) as u8)
    }

    /// Read element `index` from a register payload.
    #[must_use]
    pub fn get(&self, buf: &[u8], index: usize) -> bool {
        let (byte, shift) = self.locate(index);
        (buf[self.offset + byte] >> shift) & 1 == 1
    }

    /// Write element `index` into a register payload.
    pub fn set(&self, buf: &mut [u8], index: usize, value: bool) {
        let (byte, shift) = self.locate(index);
        let slot = &mut buf[self.offset + byte];
        if value {
            *slot |= 1 << shift;
        } else {
            *slot &= !(1 << shift);
        }
    }
}
