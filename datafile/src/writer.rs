use common::num::Cast;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use uuid::Uuid;

use crate::directory::ItemDirectory;
use crate::format;
use crate::format::Header;
use crate::format::HeaderRest;
use crate::format::HeaderVersion;
use crate::format::ItemHeader;
use crate::format::Version;
use crate::pool::DataPool;
use crate::Error;

/// Buffers items and data blocks in memory and writes them out as a
/// datafile on `finish`.
///
/// The file is first written to `<path>.<pid>.<n>.tmp` next to the
/// destination and then renamed over it, so an interrupted write never
/// clobbers the previous file. `n` is unique per writer of this process, so
/// writers targeting the same path never share a temporary file. The
/// temporary file is removed if the writer is dropped without finishing
/// successfully.
#[derive(Debug)]
pub struct Writer {
    file: Option<File>,
    path: PathBuf,
    temp_path: PathBuf,
    directory: ItemDirectory,
    pool: DataPool,
    ex_types: Vec<Uuid>,
    version: Version,
    finished: bool,
}

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

fn temp_path(path: &Path) -> PathBuf {
    let n = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.{}.tmp", process::id(), n));
    PathBuf::from(name)
}

impl Writer {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Writer, Error> {
        let path = path.as_ref().to_owned();
        let temp_path = temp_path(&path);
        let file = File::create(&temp_path).map_err(|e| {
            error!("couldn't create {}: {}", temp_path.display(), e);
            e
        })?;
        debug!("writing {} via {}", path.display(), temp_path.display());
        Ok(Writer {
            file: Some(file),
            path,
            temp_path,
            directory: ItemDirectory::new(),
            pool: DataPool::new(),
            ex_types: Vec::new(),
            version: Version::V4,
            finished: false,
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }
    /// Whether data blocks are zlib compressed (datafile version 4, the
    /// default) or stored raw (version 3).
    pub fn set_compression(&mut self, compression: bool) {
        self.version = if compression { Version::V4 } else { Version::V3 };
    }
    pub fn directory(&self) -> &ItemDirectory {
        &self.directory
    }
    pub fn add_item(&mut self, type_id: u16, id: u16, data: &[i32]) -> Result<(), Error> {
        if type_id == format::ITEMTYPE_EX {
            error!("item type {} is reserved, id={}", type_id, id);
            return Err(format::Error::Malformed.into());
        }
        Ok(self.directory.add_item(type_id, id, data)?)
    }
    /// Adds an item of an extended type, identified by UUID instead of a
    /// fixed type id.
    pub fn add_item_ex(&mut self, uuid: Uuid, id: u16, data: &[i32]) -> Result<(), Error> {
        let type_id = self.ex_type_id(uuid)?;
        Ok(self.directory.add_item(type_id, id, data)?)
    }
    fn ex_type_id(&mut self, uuid: Uuid) -> Result<u16, Error> {
        let index = match self.ex_types.iter().position(|&u| u == uuid) {
            Some(i) => i,
            None => {
                if self.ex_types.len() == format::MAX_EX_TYPES {
                    return Err(format::Error::TooManyExTypes.into());
                }
                let type_id = ex_type_id_for_index(self.ex_types.len());
                self.directory.add_item(
                    format::ITEMTYPE_EX,
                    type_id,
                    &format::uuid_to_i32s(&uuid),
                )?;
                self.ex_types.push(uuid);
                self.ex_types.len() - 1
            }
        };
        Ok(ex_type_id_for_index(index))
    }
    pub fn add_data(&mut self, data: Vec<u8>) -> usize {
        self.pool.add_data(data)
    }
    /// Adds a block of integer records. It is stored little-endian and can be
    /// read back with `Reader::read_data_swapped`.
    pub fn add_data_swapped(&mut self, data: Vec<i32>) -> usize {
        self.pool.add_data_swapped(data)
    }
    pub fn num_data(&self) -> usize {
        self.pool.num_data()
    }

    /// Writes the file and moves it into place.
    pub fn finish(mut self) -> Result<(), Error> {
        let result = self.write_and_rename();
        if let Err(ref e) = result {
            error!("couldn't write {}: {:?}", self.path.display(), e);
        } else {
            self.finished = true;
            debug!("wrote {}", self.path.display());
        }
        result
    }

    fn write_and_rename(&mut self) -> Result<(), Error> {
        let file = match self.file.take() {
            Some(f) => f,
            None => return Err(format::Error::Malformed.into()),
        };
        self.write(&file)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.temp_path, &self.path)?;
        Ok(())
    }

    fn write(&self, file: &File) -> Result<(), Error> {
        fn i(v: usize) -> Result<i32, Error> {
            v.try_i32().ok_or(Error::Df(format::Error::TooLarge))
        }

        let compress = self.version.has_compressed_data();
        let mut data = Vec::with_capacity(self.pool.num_data());
        for index in 0..self.pool.num_data() {
            let uncompressed = self.pool.data(index);
            data.push(if compress {
                zlib::compress_vec(&uncompressed).map_err(|e| {
                    error!("compression error, data={} error={}", index, e);
                    format::Error::CompressionError
                })?
            } else {
                uncompressed.into_owned()
            });
        }

        let mut header = Header {
            hv: HeaderVersion {
                magic: format::MAGIC,
                version: self.version.to_i32(),
            },
            hr: HeaderRest {
                size: 0,
                swaplen: 0,
                num_item_types: i(self.directory.num_item_types())?,
                num_items: i(self.directory.num_items())?,
                num_data: i(data.len())?,
                size_items: i(self.directory.size())?,
                size_data: i(data.iter().map(|d| d.len()).sum())?,
            },
        };
        header.hr.size = header.total_size().map_err(|_| format::Error::TooLarge)?;
        header.hr.swaplen = header.hr.size - header.hr.size_data;

        let mut dir = Vec::new();
        for (type_id, start, num) in self.directory.item_type_ranges() {
            format::extend_le_i32s(&mut dir, &[i32::from(type_id), i(start)?, i(num)?]);
        }
        let mut offset = 0;
        for item in self.directory.items() {
            format::extend_le_i32s(&mut dir, &[i(offset)?]);
            offset += format::ITEM_HEADER_SIZE + item.data.len() * 4;
        }
        let mut offset = 0;
        for d in &data {
            format::extend_le_i32s(&mut dir, &[i(offset)?]);
            offset += d.len();
        }
        if compress {
            for index in 0..self.pool.num_data() {
                format::extend_le_i32s(&mut dir, &[i(self.pool.data_size(index))?]);
            }
        }
        for item in self.directory.items() {
            let item_header = ItemHeader::new(item.type_id, item.id, i(item.data.len() * 4)?);
            format::extend_le_i32s(&mut dir, &[item_header.type_id_and_id, item_header.size]);
            format::extend_le_i32s(&mut dir, item.data);
        }

        let mut out = BufWriter::new(file);
        out.write_all(&header.to_bytes())?;
        out.write_all(&dir)?;
        for d in &data {
            out.write_all(d)?;
        }
        out.flush()?;
        debug!("finished writing, header={:?}", header);
        Ok(())
    }
}

fn ex_type_id_for_index(index: usize) -> u16 {
    // `index < MAX_EX_TYPES`, so this stays far above the fixed type ids.
    format::ITEMTYPE_EX - 1 - index as u16
}

impl Drop for Writer {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.file.take());
            if let Err(e) = fs::remove_file(&self.temp_path) {
                warn!("couldn't remove {}: {}", self.temp_path.display(), e);
            }
        }
    }
}
