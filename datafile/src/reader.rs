use common::io::FileExt;
use common::io::ReadExt;
use common::num::Cast;
use common::num::Widen;
use common::MapIterator;
use itertools::Itertools;
use std::fs::File;
use std::ops;
use std::path::Path;
use std::str;
use uuid::Uuid;

use crate::format;
use crate::format::Header;
use crate::format::ItemType;
use crate::format::ItemView;
use crate::format::Version;
use crate::Error;

/// Read access to a datafile.
///
/// The header and item directory are read and validated on open. Data
/// blocks stay on disk until requested; decompressed blocks are cached until
/// `unload_data` is called.
pub struct Reader {
    file: File,
    header: Header,
    item_types: Vec<ItemType>,
    item_offsets: Vec<i32>,
    data_offsets: Vec<i32>,
    uncomp_data_sizes: Option<Vec<i32>>,
    items_raw: Vec<i32>,
    data_cache: Vec<Option<Vec<u8>>>,
}

pub type Items<'a> = MapIterator<ItemView<'a>, &'a Reader, ops::Range<usize>>;
pub type ItemTypes<'a> = MapIterator<u16, &'a Reader, ops::Range<usize>>;
pub type ItemTypeItems<'a> = MapIterator<ItemView<'a>, &'a Reader, ops::Range<usize>>;

fn too_short<T>(what: &str, wanted: u64, got: u64) -> Result<T, Error> {
    error!("file too short for {}, wanted={} got={}", what, wanted, got);
    Err(format::Error::TooShort.into())
}

impl Reader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Reader, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            error!("couldn't open {}: {}", path.display(), e);
            e
        })?;
        Reader::new(file)
    }

    pub fn new(mut file: File) -> Result<Reader, Error> {
        let mut header_bytes = [0; format::HEADER_SIZE];
        let read = file.read_retry(&mut header_bytes)?;
        let header = Header::read(&header_bytes[..read])?;

        let file_len = file.metadata()?.len();
        if file_len < header.file_size() {
            return too_short("header sizes", header.file_size(), file_len);
        }

        let num_item_types = header.hr.num_item_types.try_usize().unwrap_or(0);
        let num_items = header.hr.num_items.try_usize().unwrap_or(0);
        let num_data = header.hr.num_data.try_usize().unwrap_or(0);
        let num_uncomp_sizes = if header.version().has_compressed_data() { num_data } else { 0 };
        let size_items = header.hr.size_items.try_usize().unwrap_or(0);

        let dir_len = num_item_types * format::ITEM_TYPE_SIZE
            + (num_items + num_data + num_uncomp_sizes) * 4
            + size_items;
        let mut dir = vec![0; dir_len];
        let read = file.read_retry(&mut dir)?;
        if read != dir_len {
            return too_short("item directory", dir_len.u64(), read.u64());
        }

        let mut values = format::le_i32s(&dir);
        let mut take = |n: usize| -> Vec<i32> { values.by_ref().take(n).collect() };
        let item_types = take(num_item_types * 3)
            .chunks_exact(3)
            .map(|c| ItemType { type_id: c[0], start: c[1], num: c[2] })
            .collect();
        let item_offsets = take(num_items);
        let data_offsets = take(num_data);
        let uncomp_data_sizes = if header.version().has_compressed_data() {
            Some(take(num_data))
        } else {
            None
        };
        let items_raw = take(size_items / 4);

        let result = Reader {
            file,
            header,
            item_types,
            item_offsets,
            data_offsets,
            uncomp_data_sizes,
            items_raw,
            data_cache: vec![None; num_data],
        };
        result.check()?;
        Ok(result)
    }

    fn check(&self) -> Result<(), format::Error> {
        let num_items = self.header.hr.num_items;
        {
            let mut expected_start = 0;
            for (i, t) in self.item_types.iter().enumerate() {
                if !(0 <= t.type_id && t.type_id < format::ITEMTYPE_ID_RANGE) {
                    error!("invalid item_type type_id: must be in range 0 to {:x}, item_type={} type_id={}", format::ITEMTYPE_ID_RANGE, i, t.type_id);
                    return Err(format::Error::Malformed);
                }
                if !(0 <= t.num && t.start >= 0 && t.num <= num_items - t.start) {
                    error!("invalid item_type num: must be in range 0 to num_items - start + 1, item_type={} type_id={} start={} num={}", i, t.type_id, t.start, t.num);
                    return Err(format::Error::Malformed);
                }
                if t.start != expected_start {
                    error!("item_types are not sequential, item_type={} type_id={} start={} expected={}", i, t.type_id, t.start, expected_start);
                    return Err(format::Error::Malformed);
                }
                expected_start += t.num;
            }
            for (i, (t1, t2)) in self.item_types.iter().tuple_windows().enumerate() {
                if !(t2.type_id > t1.type_id) {
                    error!("item_type type_id: must be larger than previous type_id, item_type1={} type_id1={} item_type2={} type_id2={}", i, t1.type_id, i + 1, t2.type_id);
                    return Err(format::Error::Malformed);
                }
            }
            if expected_start != num_items {
                error!("last item_type does not contain last item, item_type={}", self.item_types.len() as isize - 1);
                return Err(format::Error::Malformed);
            }
        }
        {
            let size_items = self.items_raw.len() * 4;
            let mut offset = 0;
            for (i, &item_offset) in self.item_offsets.iter().enumerate() {
                if item_offset.try_usize() != Some(offset) {
                    error!("invalid item offset, item={} offset={} wanted={}", i, item_offset, offset);
                    return Err(format::Error::Malformed);
                }
                offset += format::ITEM_HEADER_SIZE;
                if offset > size_items {
                    error!("item header out of bounds, item={} offset={} size_items={}", i, offset, size_items);
                    return Err(format::Error::Malformed);
                }
                let size = self.items_raw[offset / 4 - 1];
                let size = match size.try_usize() {
                    Some(s) if s % 4 == 0 => s,
                    _ => {
                        error!("item has invalid size, item={} size={}", i, size);
                        return Err(format::Error::Malformed);
                    }
                };
                offset += size;
                if offset > size_items {
                    error!("item out of bounds, item={} size={} size_items={}", i, size, size_items);
                    return Err(format::Error::Malformed);
                }
            }
            if offset != size_items {
                error!("last item not large enough, item={} offset={} size_items={}", num_items - 1, offset, size_items);
                return Err(format::Error::Malformed);
            }
        }
        {
            if let Some(ref uds) = self.uncomp_data_sizes {
                if let Some((i, &s)) = uds.iter().find_position(|&&s| s < 0) {
                    error!("invalid data's uncompressed size, data={} uncomp_data_size={}", i, s);
                    return Err(format::Error::Malformed);
                }
            }
            if let Some((i, &offset)) = self
                .data_offsets
                .iter()
                .find_position(|&&o| o < 0 || o > self.header.hr.size_data)
            {
                error!("invalid data offset, data={} offset={}", i, offset);
                return Err(format::Error::Malformed);
            }
            for (i, (o1, o2)) in self.data_offsets.iter().tuple_windows().enumerate() {
                if o1 > o2 {
                    error!("data overlaps, data1={} data2={}", i, i + 1);
                    return Err(format::Error::Malformed);
                }
            }
        }
        for (i, t) in self.item_types.iter().enumerate() {
            for k in t.start as usize..(t.start + t.num) as usize {
                let item_header_type = self.item(k).type_id;
                if i32::from(item_header_type) != t.type_id {
                    error!("item does not have right type_id, type={} type_id1={} item={} type_id2={}", i, t.type_id, k, item_header_type);
                    return Err(format::Error::Malformed);
                }
            }
        }
        Ok(())
    }

    pub fn version(&self) -> Version {
        self.header.version()
    }
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn item(&self, index: usize) -> ItemView {
        // Offsets and sizes were validated in `check`.
        let start = self.item_offsets[index] as usize / 4;
        let type_id_and_id = self.items_raw[start];
        let size = self.items_raw[start + 1] as usize / 4;
        let header = format::ItemHeader { type_id_and_id, size: 0 };
        ItemView {
            type_id: header.type_id(),
            id: header.id(),
            data: &self.items_raw[start + 2..][..size],
        }
    }
    pub fn num_items(&self) -> usize {
        self.item_offsets.len()
    }
    pub fn num_data(&self) -> usize {
        self.data_offsets.len()
    }
    pub fn item_type(&self, index: usize) -> u16 {
        self.item_types[index].type_id as u16
    }
    pub fn num_item_types(&self) -> usize {
        self.item_types.len()
    }
    pub fn item_type_indices(&self, type_id: u16) -> ops::Range<usize> {
        for t in &self.item_types {
            if t.type_id == i32::from(type_id) {
                // Overflow check was in `check`.
                let start = t.start as usize;
                return start..start + t.num as usize;
            }
        }
        0..0
    }
    pub fn find_item(&self, type_id: u16, item_id: u16) -> Option<ItemView> {
        self.item_type_items(type_id).find(|item| item.id == item_id)
    }

    /// Type id that the extended type `uuid` was given in this file.
    pub fn ex_type_id(&self, uuid: &Uuid) -> Option<u16> {
        self.item_type_items(format::ITEMTYPE_EX)
            .find(|item| format::uuid_from_i32s(item.data).as_ref() == Some(uuid))
            .map(|item| item.id)
    }
    pub fn item_type_ex_indices(&self, uuid: &Uuid) -> ops::Range<usize> {
        match self.ex_type_id(uuid) {
            Some(type_id) => self.item_type_indices(type_id),
            None => 0..0,
        }
    }
    pub fn find_item_ex(&self, uuid: &Uuid, item_id: u16) -> Option<ItemView> {
        self.find_item(self.ex_type_id(uuid)?, item_id)
    }

    fn data_range_file(&self, index: usize) -> (u64, usize) {
        let start = self.data_offsets[index];
        let end = match self.data_offsets.get(index + 1) {
            Some(&next) => next,
            None => self.header.hr.size_data,
        };
        // Monotonicity and bounds were validated in `check`.
        (start as u64, (end - start) as usize)
    }

    fn load_data(&self, index: usize) -> Result<Vec<u8>, Error> {
        let (start, raw_len) = self.data_range_file(index);
        let mut raw = vec![0; raw_len];
        let read = self
            .file
            .read_offset_retry(&mut raw, self.header.data_start() + start)?;
        if read != raw_len {
            return too_short("data block", raw_len.u64(), read.u64());
        }
        match self.uncomp_data_sizes {
            Some(ref uds) => {
                let len = uds[index] as usize;
                zlib::uncompress_vec(&raw, len).map_err(|e| {
                    error!("decompression error, data={} size={} error={}", index, len, e);
                    Error::Df(format::Error::CompressionError)
                })
            }
            None => Ok(raw),
        }
    }

    /// Returns the contents of a data block, decompressing it on first
    /// access.
    pub fn read_data(&mut self, index: usize) -> Result<&[u8], Error> {
        if index >= self.num_data() {
            error!("data index out of range, data={} num_data={}", index, self.num_data());
            return Err(format::Error::InvalidDataIndex(index).into());
        }
        if self.data_cache[index].is_none() {
            let data = self.load_data(index)?;
            self.data_cache[index] = Some(data);
        }
        Ok(self.data_cache[index].as_deref().unwrap_or(&[]))
    }
    /// Reads a block written with `Writer::add_data_swapped`. Trailing bytes
    /// that don't form a whole integer are ignored.
    pub fn read_data_swapped(&mut self, index: usize) -> Result<Vec<i32>, Error> {
        Ok(format::le_i32s(self.read_data(index)?).collect())
    }
    /// Uncompressed size of a data block, without reading it.
    pub fn data_size(&self, index: usize) -> Option<usize> {
        if index >= self.num_data() {
            return None;
        }
        Some(match self.uncomp_data_sizes {
            Some(ref uds) => uds[index] as usize,
            None => self.data_range_file(index).1,
        })
    }
    /// Drops the cached contents of a data block. It is read again from
    /// disk on the next access.
    pub fn unload_data(&mut self, index: usize) {
        if let Some(cached) = self.data_cache.get_mut(index) {
            *cached = None;
        }
    }
    pub fn is_data_loaded(&self, index: usize) -> bool {
        matches!(self.data_cache.get(index), Some(Some(_)))
    }

    pub fn items(&self) -> Items {
        fn map_fn<'a>(i: usize, self_: &mut &'a Reader) -> ItemView<'a> {
            self_.item(i)
        }
        MapIterator::new(self, 0..self.num_items(), map_fn)
    }
    pub fn item_types(&self) -> ItemTypes {
        fn map_fn(i: usize, self_: &mut &Reader) -> u16 {
            self_.item_type(i)
        }
        MapIterator::new(self, 0..self.num_item_types(), map_fn)
    }
    pub fn item_type_items(&self, type_id: u16) -> ItemTypeItems {
        fn map_fn<'a>(i: usize, self_: &mut &'a Reader) -> ItemView<'a> {
            self_.item(i)
        }
        MapIterator::new(self, self.item_type_indices(type_id), map_fn)
    }

    pub fn debug_dump(&mut self) -> Result<(), Error> {
        if !log_enabled!(log::Level::Debug) {
            return Ok(());
        }
        debug!("DATAFILE");
        debug!("header: {:?}", self.header);

        for type_id in self.item_types() {
            debug!("item_type type_id={}", type_id);
            for item in self.item_type_items(type_id) {
                debug!("\titem id={} data={:?}", item.id, item.data);
            }
        }
        for i in 0..self.num_data() {
            let loaded = self.is_data_loaded(i);
            let data = self.read_data(i)?;
            debug!("data id={} size={}", i, data.len());
            if data.len() < 256 {
                match str::from_utf8(data) {
                    Ok(s) => debug!("\tstr={:?}", s),
                    Err(_) => {
                        for line in hexdump::hexdump_iter(data) {
                            debug!("\t{}", line);
                        }
                    }
                }
            }
            if !loaded {
                self.unload_data(i);
            }
        }
        Ok(())
    }
}
