use crate::SECTOR_SIZE;
use core::fmt::{Debug, Formatter};
use core::mem::offset_of;
use static_assertions::{assert_eq_size, const_assert_eq};

/// The typeflag of a regular file
pub const REGTYPE: u8 = b'0';

/// The typeflag of a regular file as written by pre-POSIX archivers
pub const AREGTYPE: u8 = 0;

const USTAR_MAGIC: &[u8; 5] = b"ustar";

/// A header block of a ustar archive.
///
/// All numeric fields are ASCII octal strings.
#[repr(C)]
#[derive(Clone)]
pub struct TarHeader {
    pub name: [u8; 100],
    pub mode: [u8; 8],
    pub uid: [u8; 8],
    pub gid: [u8; 8],
    pub size: [u8; 12],
    pub mtime: [u8; 12],
    pub checksum: [u8; 8],
    pub typeflag: u8,
    pub linkname: [u8; 100],
    pub magic: [u8; 6],
    pub version: [u8; 2],
    pub uname: [u8; 32],
    pub gname: [u8; 32],
    pub devmajor: [u8; 8],
    pub devminor: [u8; 8],
    pub prefix: [u8; 155],
    _padding: [u8; 12],
}

assert_eq_size!(TarHeader, [u8; SECTOR_SIZE]);
const_assert_eq!(offset_of!(TarHeader, checksum), 148);
const_assert_eq!(offset_of!(TarHeader, magic), 257);

const CHECKSUM_RANGE: core::ops::Range<usize> = 148..156;

impl TarHeader {
    /// Create the header of a regular file named `name` holding `size` bytes.
    ///
    /// The checksum is already filled in.
    pub fn new_file(name: &[u8], size: usize) -> Self {
        let mut header = Self::from_block(&[0; SECTOR_SIZE]).clone();
        header.name[..name.len()].copy_from_slice(name);
        write_octal(&mut header.mode, 0o644);
        write_octal(&mut header.uid, 0);
        write_octal(&mut header.gid, 0);
        write_octal(&mut header.size, size as u64);
        write_octal(&mut header.mtime, 0);
        header.typeflag = REGTYPE;
        header.magic[..USTAR_MAGIC.len()].copy_from_slice(USTAR_MAGIC);
        header.version = *b"00";
        header.update_checksum();
        header
    }

    /// Interpret a block of the archive as header
    pub fn from_block(block: &[u8; SECTOR_SIZE]) -> &Self {
        unsafe { &*block.as_ptr().cast::<Self>() }
    }

    pub fn as_bytes(&self) -> &[u8; SECTOR_SIZE] {
        unsafe { &*(self as *const Self).cast::<[u8; SECTOR_SIZE]>() }
    }

    /// Whether this is an all-zero block which marks the end of the archive
    pub fn is_end(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    pub fn has_ustar_magic(&self) -> bool {
        &self.magic[..USTAR_MAGIC.len()] == USTAR_MAGIC
    }

    pub fn is_regular_file(&self) -> bool {
        matches!(self.typeflag, REGTYPE | AREGTYPE)
    }

    /// The file name without trailing null bytes
    pub fn name(&self) -> &[u8] {
        trim_nul(&self.name)
    }

    /// The size of the file content or `None` if the size field is malformed
    pub fn size(&self) -> Option<usize> {
        parse_octal(&self.size).map(|size| size as usize)
    }

    /// Sum all bytes of the header while treating the checksum field as if it were filled with spaces
    pub fn compute_checksum(&self) -> u32 {
        self.as_bytes()
            .iter()
            .enumerate()
            .map(|(i, b)| {
                if CHECKSUM_RANGE.contains(&i) {
                    b' ' as u32
                } else {
                    *b as u32
                }
            })
            .sum()
    }

    pub fn verify_checksum(&self) -> bool {
        parse_octal(&self.checksum) == Some(self.compute_checksum() as u64)
    }

    /// Recompute the checksum and store it as six octal digits followed by a null byte and a space
    pub fn update_checksum(&mut self) {
        let checksum = self.compute_checksum();
        write_octal(&mut self.checksum[..7], checksum as u64);
        self.checksum[7] = b' ';
    }
}

impl Debug for TarHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TarHeader")
            .field("name", &core::str::from_utf8(self.name()).unwrap_or("<binary>"))
            .field("size", &self.size())
            .field("typeflag", &(self.typeflag as char))
            .finish_non_exhaustive()
    }
}

fn trim_nul(field: &[u8]) -> &[u8] {
    let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    &field[..len]
}

/// Parse a numeric field.
///
/// Leading spaces are skipped and the number ends at the first null byte or space.
fn parse_octal(field: &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    let mut digits = field
        .iter()
        .skip_while(|b| **b == b' ')
        .take_while(|b| **b != 0 && **b != b' ')
        .peekable();
    digits.peek()?;
    for b in digits {
        match b {
            b'0'..=b'7' => value = value.checked_mul(8)? + u64::from(b - b'0'),
            _ => return None,
        }
    }
    Some(value)
}

/// Fill `field` with zero padded octal digits and a terminating null byte
fn write_octal(field: &mut [u8], mut value: u64) {
    let last = field.len() - 1;
    field[last] = 0;
    for digit in field[..last].iter_mut().rev() {
        *digit = b'0' + (value % 8) as u8;
        value /= 8;
    }
    assert_eq!(value, 0, "value does not fit into octal field");
}
