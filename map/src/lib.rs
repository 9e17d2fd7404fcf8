//! DDNet maps: the item layouts stored in the datafile container, an
//! in-memory map graph, and loading and saving between the two.
//!
//! Loading upgrades legacy layouts (old tilemap versions, the deprecated
//! sound layer type, missing group names) so that a resaved map always uses
//! the current ones.

#[macro_use]
extern crate common;
#[macro_use]
extern crate log;

pub use model::*;
pub use services::Defaults;
pub use services::ErrorSink;
pub use services::LoadOptions;

use datafile as df;
use std::error;
use std::fmt;
use std::io;

#[rustfmt::skip]
pub mod format;
pub mod model;
mod reader;
pub mod sanity;
pub mod services;
pub mod tiles;
mod writer;

#[derive(Debug)]
pub enum Error {
    Map(format::Error),
    Df(df::Error),
}

impl From<format::Error> for Error {
    fn from(err: format::Error) -> Error {
        Error::Map(err)
    }
}

impl From<df::Error> for Error {
    fn from(err: df::Error) -> Error {
        Error::Df(err)
    }
}

impl From<df::format::Error> for Error {
    fn from(err: df::format::Error) -> Error {
        Error::Df(err.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Df(err.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Map(ref e) => e.fmt(f),
            Error::Df(ref e) => e.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Map(_) => None,
            Error::Df(ref e) => Some(e),
        }
    }
}
