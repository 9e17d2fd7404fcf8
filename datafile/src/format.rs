use common::num::Cast;
use common::num::Widen;
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub enum Error {
    WrongMagic([u8; 4]),
    UnsupportedVersion(i32),
    MalformedHeader,
    Malformed,
    CompressionError,
    TooShort,
    TooShortHeaderVersion,
    TooShortHeader,
    InvalidDataIndex(usize),
    DuplicateItem { type_id: u16, id: u16 },
    TooManyExTypes,
    TooLarge,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::WrongMagic(m) => write!(f, "not a datafile, magic={:?}", m),
            Error::UnsupportedVersion(v) => write!(f, "unsupported datafile version {}", v),
            Error::MalformedHeader => f.write_str("malformed datafile header"),
            Error::Malformed => f.write_str("malformed datafile"),
            Error::CompressionError => f.write_str("datafile block (de)compression failed"),
            Error::TooShort => f.write_str("datafile is truncated"),
            Error::TooShortHeaderVersion | Error::TooShortHeader => {
                f.write_str("datafile header is truncated")
            }
            Error::InvalidDataIndex(i) => write!(f, "data block {} does not exist", i),
            Error::DuplicateItem { type_id, id } => {
                write!(f, "item type_id={} id={} added twice", type_id, id)
            }
            Error::TooManyExTypes => f.write_str("too many extended item types"),
            Error::TooLarge => f.write_str("datafile exceeds the format's size limits"),
        }
    }
}

pub const MAGIC: [u8; 4] = *b"DATA";
pub const MAGIC_BIGENDIAN: [u8; 4] = *b"ATAD";
pub const VERSION3: i32 = 3;
pub const VERSION4: i32 = 4;
pub const ITEMTYPE_ID_RANGE: i32 = 0x10000;
/// Items of this type map a UUID (payload) to the type id (item id) it was
/// given in this file.
pub const ITEMTYPE_EX: u16 = 0xffff;
/// Number of extended types a single file can hold. Their type ids are
/// allocated downwards from `ITEMTYPE_EX - 1`.
pub const MAX_EX_TYPES: usize = 0x1000;

pub const HEADER_VERSION_SIZE: usize = 8;
pub const HEADER_SIZE: usize = 36;
pub const ITEM_TYPE_SIZE: usize = 12;
pub const ITEM_HEADER_SIZE: usize = 8;

#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub enum Version {
    V3,
    V4,
}

impl Version {
    pub fn has_compressed_data(self) -> bool {
        match self {
            Version::V3 => false,
            Version::V4 => true,
        }
    }
    pub fn to_i32(self) -> i32 {
        match self {
            Version::V3 => VERSION3,
            Version::V4 => VERSION4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct HeaderVersion {
    pub magic: [u8; 4],
    pub version: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct HeaderRest {
    pub size: i32,
    pub swaplen: i32,
    pub num_item_types: i32,
    pub num_items: i32,
    pub num_data: i32,
    pub size_items: i32,
    pub size_data: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct Header {
    pub hv: HeaderVersion,
    pub hr: HeaderRest,
}

#[derive(Clone, Copy, Debug)]
pub struct ItemType {
    pub type_id: i32,
    pub start: i32,
    pub num: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct ItemHeader {
    pub type_id_and_id: i32,
    pub size: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct ItemView<'a> {
    pub type_id: u16,
    pub id: u16,
    pub data: &'a [i32],
}

pub fn le_i32s(bytes: &[u8]) -> impl Iterator<Item = i32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

pub fn extend_le_i32s(out: &mut Vec<u8>, values: &[i32]) {
    out.reserve(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

impl Header {
    /// Parses the version part of the header. Fails on short input or a
    /// wrong magic/version.
    pub fn read_version(bytes: &[u8]) -> Result<HeaderVersion, Error> {
        if bytes.len() < HEADER_VERSION_SIZE {
            return Err(Error::TooShortHeaderVersion);
        }
        let hv = HeaderVersion {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        };
        hv.check()?;
        Ok(hv)
    }
    pub fn read(bytes: &[u8]) -> Result<Header, Error> {
        let hv = Header::read_version(bytes)?;
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TooShortHeader);
        }
        let mut v = le_i32s(&bytes[HEADER_VERSION_SIZE..HEADER_SIZE]);
        let mut next = || v.next().unwrap_or(0);
        let hr = HeaderRest {
            size: next(),
            swaplen: next(),
            num_item_types: next(),
            num_items: next(),
            num_data: next(),
            size_items: next(),
            size_data: next(),
        };
        hr.check()?;
        let result = Header { hv, hr };
        result.check()?;
        debug!("read header={:?}", result);
        Ok(result)
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(HEADER_SIZE);
        result.extend_from_slice(&self.hv.magic);
        extend_le_i32s(
            &mut result,
            &[
                self.hv.version,
                self.hr.size,
                self.hr.swaplen,
                self.hr.num_item_types,
                self.hr.num_items,
                self.hr.num_data,
                self.hr.size_items,
                self.hr.size_data,
            ],
        );
        result
    }
    pub fn version(&self) -> Version {
        if self.hv.version == VERSION3 {
            Version::V3
        } else {
            Version::V4
        }
    }
    pub fn check(&self) -> Result<(), Error> {
        let expected_size = self.total_size()?;
        if self.hr.size != expected_size {
            error!(
                "size does not match expected size, size={} expected={}",
                self.hr.size, expected_size
            );
            return Err(Error::MalformedHeader);
        }
        if self.hr.swaplen != self.hr.size - self.hr.size_data {
            // Only used for endian swapping by the reference implementation.
            warn!(
                "swaplen does not match, swaplen={} expected={}",
                self.hr.swaplen,
                self.hr.size - self.hr.size_data
            );
        }
        Ok(())
    }
    /// Value of the `size` field implied by the other fields.
    pub fn total_size(&self) -> Result<i32, Error> {
        fn u(val: i32) -> u64 {
            val.try_u64().unwrap_or(0)
        }
        let data_sizes = if self.hv.version >= VERSION4 { 4 * u(self.hr.num_data) } else { 0 };
        // Can't overflow, these are small multiples of `i32`s.
        let result: u64 = 20 // header_rest without size, swaplen
            + ITEM_TYPE_SIZE.u64() * u(self.hr.num_item_types)
            + 4 * u(self.hr.num_items) // item_offsets
            + 4 * u(self.hr.num_data) // data_offsets
            + data_sizes
            + u(self.hr.size_items)
            + u(self.hr.size_data);
        result.try_i32().ok_or(Error::MalformedHeader)
    }
    /// Length of the file implied by the header.
    pub fn file_size(&self) -> u64 {
        16 + u64::from(self.hr.size.try_u32().unwrap_or(0))
    }
    /// Offset of the first item type, relative to the start of the file.
    pub fn item_types_start(&self) -> usize {
        HEADER_SIZE
    }
    /// Offset of the data section, relative to the start of the file.
    pub fn data_start(&self) -> u64 {
        self.file_size() - u64::from(self.hr.size_data.try_u32().unwrap_or(0))
    }
}

impl HeaderVersion {
    pub fn check(&self) -> Result<(), Error> {
        Err(if self.magic != MAGIC && self.magic != MAGIC_BIGENDIAN {
            error!(
                "wrong datafile signature, magic={:08x}",
                u32::from_be_bytes(self.magic)
            );
            Error::WrongMagic(self.magic)
        } else if self.version != VERSION3 && self.version != VERSION4 {
            error!("unsupported datafile version, version={}", self.version);
            Error::UnsupportedVersion(self.version)
        } else {
            return Ok(());
        })
    }
}

impl HeaderRest {
    pub fn check(&self) -> Result<(), Error> {
        if self.size < 0 {
            error!("size is negative, size={}", self.size);
        } else if self.swaplen < 0 {
            error!("swaplen is negative, swaplen={}", self.swaplen);
        } else if self.num_item_types < 0 {
            error!("num_item_types is negative, num_item_types={}", self.num_item_types);
        } else if self.num_items < 0 {
            error!("num_items is negative, num_items={}", self.num_items);
        } else if self.num_data < 0 {
            error!("num_data is negative, num_data={}", self.num_data);
        } else if self.size_items < 0 {
            error!("size_items is negative, size_items={}", self.size_items);
        } else if self.size_data < 0 {
            error!("size_data is negative, size_data={}", self.size_data);
        } else if self.size_items % 4 != 0 {
            error!("size_items not divisible by 4, size_items={}", self.size_items);
        } else {
            return Ok(());
        }
        Err(Error::MalformedHeader)
    }
}

impl ItemHeader {
    pub fn new(type_id: u16, id: u16, size: i32) -> ItemHeader {
        ItemHeader {
            type_id_and_id: ((u32::from(type_id) << 16) | u32::from(id)) as i32,
            size,
        }
    }
    pub fn type_id(&self) -> u16 {
        ((self.type_id_and_id as u32) >> 16) as u16
    }
    pub fn id(&self) -> u16 {
        self.type_id_and_id as u32 as u16
    }
}

fn uuid_namespace() -> Uuid {
    Uuid::from_bytes([
        0xe0, 0x5d, 0xda, 0xaa, 0xc4, 0xe6, 0x4c, 0xfb,
        0xb6, 0x42, 0x5d, 0x48, 0xe8, 0x0c, 0x00, 0x29,
    ])
}

/// Name-based UUID of an extended item type, e.g.
/// `"mapitemtype-group@ddnet.tw"`.
pub fn ex_type_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&uuid_namespace(), name.as_bytes())
}

/// Payload of an `ITEMTYPE_EX` item.
pub fn uuid_to_i32s(uuid: &Uuid) -> [i32; 4] {
    let b = uuid.as_bytes();
    let mut result = [0; 4];
    for (r, c) in result.iter_mut().zip(b.chunks_exact(4)) {
        *r = i32::from_be_bytes([c[0], c[1], c[2], c[3]]);
    }
    result
}

pub fn uuid_from_i32s(data: &[i32]) -> Option<Uuid> {
    if data.len() < 4 {
        return None;
    }
    let mut bytes = [0; 16];
    for (c, v) in bytes.chunks_exact_mut(4).zip(data) {
        c.copy_from_slice(&v.to_be_bytes());
    }
    Some(Uuid::from_bytes(bytes))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn item_header_ids() {
        let h = ItemHeader::new(0xfffe, 0xfffd, 8);
        assert_eq!(h.type_id(), 0xfffe);
        assert_eq!(h.id(), 0xfffd);
        assert!(h.type_id_and_id < 0);
    }

    #[test]
    fn header_bytes() {
        let mut header = Header {
            hv: HeaderVersion { magic: MAGIC, version: VERSION4 },
            hr: HeaderRest {
                size: 0,
                swaplen: 0,
                num_item_types: 1,
                num_items: 1,
                num_data: 1,
                size_items: 12,
                size_data: 10,
            },
        };
        header.hr.size = header.total_size().unwrap();
        header.hr.swaplen = header.hr.size - header.hr.size_data;
        assert_eq!(header.hr.size, 20 + 12 + 4 + 4 + 4 + 12 + 10);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[..4], b"DATA");
        let parsed = Header::read(&bytes).unwrap();
        assert_eq!(parsed.hr.size, header.hr.size);
        assert_eq!(parsed.file_size(), 16 + header.hr.size as u64);
        assert_eq!(parsed.data_start(), parsed.file_size() - 10);
    }

    #[test]
    fn bad_headers() {
        assert_eq!(Header::read(b"DATA").unwrap_err(), Error::TooShortHeaderVersion);
        assert_eq!(
            Header::read(b"PNG\x00\x04\x00\x00\x00").unwrap_err(),
            Error::WrongMagic(*b"PNG\x00"),
        );
        assert_eq!(
            Header::read(b"DATA\x05\x00\x00\x00").unwrap_err(),
            Error::UnsupportedVersion(5),
        );
        assert_eq!(Header::read(b"DATA\x04\x00\x00\x00").unwrap_err(), Error::TooShortHeader);
    }

    #[test]
    fn uuid_payload() {
        let uuid = ex_type_uuid("mapitemtype-group@ddnet.tw");
        assert_eq!(uuid.get_version_num(), 3);
        assert_eq!(uuid_from_i32s(&uuid_to_i32s(&uuid)), Some(uuid));
        assert_ne!(uuid, ex_type_uuid("mapitemtype-envpoints-bezier@ddnet.tw"));
    }
}
