//! Reading and writing of datafiles, the container format of Teeworlds and
//! DDNet maps: a directory of small typed integer records ("items") plus a
//! pool of optionally zlib-compressed byte blocks ("data").

#[macro_use]
extern crate log;

pub use self::directory::ItemDirectory;
pub use self::format::ItemView;
pub use self::format::Version;
pub use self::job::Jobs;
pub use self::pool::DataPool;
pub use self::reader::ItemTypeItems;
pub use self::reader::ItemTypes;
pub use self::reader::Items;
pub use self::reader::Reader;
pub use self::writer::Writer;

use std::error;
use std::fmt;
use std::io;

pub mod directory;
pub mod format;
mod job;
pub mod pool;
mod reader;
mod writer;

#[derive(Debug)]
pub enum Error {
    Df(format::Error),
    Io(io::Error),
}

impl From<format::Error> for Error {
    fn from(err: format::Error) -> Error {
        Error::Df(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Df(ref e) => e.fmt(f),
            Error::Io(ref e) => e.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Df(_) => None,
            Error::Io(ref e) => Some(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::format;
    use super::Error;
    use super::Jobs;
    use super::Reader;
    use super::Version;
    use super::Writer;
    use std::fs;
    use tempfile::TempDir;

    fn write_sample(writer: &mut Writer) {
        writer.add_item(1, 0, &[1, 2, 3]).unwrap();
        writer.add_item(0, 0, &[1]).unwrap();
        writer.add_item(1, 1, &[]).unwrap();
        let group = format::ex_type_uuid("mapitemtype-group@ddnet.tw");
        writer.add_item_ex(group, 0, &[1, 100]).unwrap();
        assert_eq!(writer.add_data(b"hello".to_vec()), 0);
        assert_eq!(writer.add_data_swapped(vec![-1, 0x01020304]), 1);
        assert_eq!(writer.add_data(Vec::new()), 2);
    }

    fn check_sample(reader: &mut Reader) {
        assert_eq!(reader.item_types().collect::<Vec<_>>(), [0, 1, 0xfffe, 0xffff]);
        assert_eq!(reader.item_type_indices(1), 1..3);
        assert_eq!(reader.find_item(1, 0).unwrap().data, [1, 2, 3]);
        assert!(reader.find_item(1, 1).unwrap().data.is_empty());
        assert!(reader.find_item(1, 2).is_none());
        let group = format::ex_type_uuid("mapitemtype-group@ddnet.tw");
        assert_eq!(reader.ex_type_id(&group), Some(0xfffe));
        assert_eq!(reader.find_item_ex(&group, 0).unwrap().data, [1, 100]);
        let bezier = format::ex_type_uuid("mapitemtype-envpoints-bezier@ddnet.tw");
        assert_eq!(reader.item_type_ex_indices(&bezier), 0..0);

        assert_eq!(reader.num_data(), 3);
        assert_eq!(reader.data_size(0), Some(5));
        assert_eq!(reader.data_size(3), None);
        assert_eq!(reader.read_data(0).unwrap(), b"hello");
        assert!(reader.is_data_loaded(0));
        reader.unload_data(0);
        assert!(!reader.is_data_loaded(0));
        assert_eq!(reader.read_data(0).unwrap(), b"hello");
        assert_eq!(reader.read_data_swapped(1).unwrap(), [-1, 0x01020304]);
        assert_eq!(reader.read_data(2).unwrap(), b"");
        match reader.read_data(3) {
            Err(Error::Df(format::Error::InvalidDataIndex(3))) => {}
            other => panic!("unexpected {:?}", other.map(|d| d.len())),
        }
        reader.debug_dump().unwrap();
    }

    #[test]
    fn compressed() {
        logger::init_test();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.map");
        let mut writer = Writer::open(&path).unwrap();
        let temp_path = writer.temp_path().to_owned();
        assert!(temp_path.exists());
        write_sample(&mut writer);
        writer.finish().unwrap();
        assert!(!temp_path.exists());

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"DATA");
        let mut reader = Reader::open(&path).unwrap();
        assert_eq!(reader.version(), Version::V4);
        assert_eq!(reader.header().file_size(), bytes.len() as u64);
        check_sample(&mut reader);
    }

    #[test]
    fn uncompressed() {
        logger::init_test();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.map");
        let mut writer = Writer::open(&path).unwrap();
        writer.set_compression(false);
        write_sample(&mut writer);
        writer.finish().unwrap();

        let mut reader = Reader::open(&path).unwrap();
        assert_eq!(reader.version(), Version::V3);
        check_sample(&mut reader);
    }

    #[test]
    fn same_path_writers_keep_separate_files() {
        logger::init_test();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.map");
        let mut first = Writer::open(&path).unwrap();
        let mut second = Writer::open(&path).unwrap();
        assert_ne!(first.temp_path(), second.temp_path());
        first.add_item(0, 0, &[1]).unwrap();
        write_sample(&mut second);
        let second_temp = second.temp_path().to_owned();

        let mut jobs = Jobs::new();
        jobs.submit(first).unwrap();
        jobs.submit(second).unwrap();
        jobs.wait_all().unwrap();
        assert!(!second_temp.exists());
        check_sample(&mut Reader::open(&path).unwrap());
    }

    #[test]
    fn dropped_writer_leaves_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.map");
        fs::write(&path, b"previous").unwrap();
        let mut writer = Writer::open(&path).unwrap();
        let temp_path = writer.temp_path().to_owned();
        write_sample(&mut writer);
        drop(writer);
        assert!(!temp_path.exists());
        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }

    #[test]
    fn reserved_and_duplicate_items() {
        let dir = TempDir::new().unwrap();
        let mut writer = Writer::open(dir.path().join("a.map")).unwrap();
        assert!(writer.add_item(format::ITEMTYPE_EX, 0, &[]).is_err());
        writer.add_item(3, 7, &[]).unwrap();
        match writer.add_item(3, 7, &[1]) {
            Err(Error::Df(format::Error::DuplicateItem { type_id: 3, id: 7 })) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn background_finish() {
        logger::init_test();
        let dir = TempDir::new().unwrap();
        let mut jobs = Jobs::new();
        for name in &["a.map", "b.map", "a.map"] {
            let mut writer = Writer::open(dir.path().join(name)).unwrap();
            write_sample(&mut writer);
            jobs.submit(writer).unwrap();
        }
        jobs.wait_all().unwrap();
        assert_eq!(jobs.num_pending(), 0);
        for name in &["a.map", "b.map"] {
            check_sample(&mut Reader::open(dir.path().join(name)).unwrap());
        }
    }

    #[test]
    fn failed_finish_is_reported() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("dir.map");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"").unwrap();
        let mut writer = Writer::open(&target).unwrap();
        write_sample(&mut writer);
        let mut jobs = Jobs::new();
        jobs.submit(writer).unwrap();
        assert!(jobs.wait_all().is_err());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.map");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();
        match Reader::open(&path) {
            Err(Error::Df(format::Error::WrongMagic(_))) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
        assert!(matches!(Reader::open(dir.path().join("missing.map")), Err(Error::Io(_))));
    }

    #[test]
    fn rejects_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.map");
        let mut writer = Writer::open(&path).unwrap();
        write_sample(&mut writer);
        writer.finish().unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();
        match Reader::open(&path) {
            Err(Error::Df(format::Error::TooShort)) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
