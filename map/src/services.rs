//! Collaborators used while loading a map: file lookup, image decoding,
//! texture upload, sound registration and error reporting.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::model::ImageFormat;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SampleId(pub u32);

/// Resolves paths relative to some search location.
pub trait Storage {
    fn read_file(&mut self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads files below a fixed directory.
#[derive(Clone, Debug)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> DiskStorage {
        DiskStorage { root: root.into() }
    }
}

impl Storage for DiskStorage {
    fn read_file(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

pub trait ImageDecoder {
    fn decode_png(&mut self, data: &[u8]) -> io::Result<DecodedImage>;
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextureLoad {
    Plain,
    /// Split into 16x16 tiles for use by tile layers. Only possible if both
    /// dimensions are multiples of 16.
    Tiled,
}

pub trait Textures {
    /// Returns `None` if the texture couldn't be created.
    fn load_texture_raw(
        &mut self,
        width: u32,
        height: u32,
        format: ImageFormat,
        data: &[u8],
        load: TextureLoad,
        name: &str,
    ) -> Option<TextureId>;
}

pub trait Audio {
    /// Registers an opus file. Returns `None` if it can't be decoded.
    fn load_opus(&mut self, data: &[u8]) -> Option<SampleId>;
}

pub trait ErrorSink {
    fn report(&mut self, message: &str);
}

/// Decodes nothing, uploads nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Null;

impl ImageDecoder for Null {
    fn decode_png(&mut self, _data: &[u8]) -> io::Result<DecodedImage> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "no image decoder"))
    }
}

impl Textures for Null {
    fn load_texture_raw(
        &mut self,
        _width: u32,
        _height: u32,
        _format: ImageFormat,
        _data: &[u8],
        _load: TextureLoad,
        _name: &str,
    ) -> Option<TextureId> {
        None
    }
}

impl Audio for Null {
    fn load_opus(&mut self, _data: &[u8]) -> Option<SampleId> {
        None
    }
}

/// Reports errors as log warnings.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&mut self, message: &str) {
        warn!("{}", message);
    }
}

impl ErrorSink for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_owned());
    }
}

pub struct LoadOptions<'a> {
    pub storage: &'a mut dyn Storage,
    pub images: &'a mut dyn ImageDecoder,
    pub textures: &'a mut dyn Textures,
    pub audio: &'a mut dyn Audio,
    pub errors: &'a mut dyn ErrorSink,
    /// Directory of external images and sounds, relative to the storage.
    pub mapres: PathBuf,
}

/// Owns a set of collaborators that do no decoding and only log errors.
/// Use `Defaults::options` to borrow them as `LoadOptions`.
#[derive(Debug)]
pub struct Defaults {
    pub storage: DiskStorage,
    pub images: Null,
    pub textures: Null,
    pub audio: Null,
    pub errors: LogSink,
}

impl Defaults {
    /// Looks up external resources below `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Defaults {
        Defaults {
            storage: DiskStorage::new(root),
            images: Null,
            textures: Null,
            audio: Null,
            errors: LogSink,
        }
    }
    pub fn options(&mut self) -> LoadOptions {
        LoadOptions {
            storage: &mut self.storage,
            images: &mut self.images,
            textures: &mut self.textures,
            audio: &mut self.audio,
            errors: &mut self.errors,
            mapres: PathBuf::from("mapres"),
        }
    }
}

impl<'a> LoadOptions<'a> {
    pub fn external_image_path(&self, name: &str) -> PathBuf {
        self.mapres.join(format!("{}.png", name))
    }
    pub fn external_sound_path(&self, name: &str) -> PathBuf {
        self.mapres.join(format!("{}.opus", name))
    }
}
