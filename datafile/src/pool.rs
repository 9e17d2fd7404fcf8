use std::borrow::Cow;

use crate::format;

#[derive(Clone, Debug)]
enum Block {
    Bytes(Vec<u8>),
    /// Integer records, stored little-endian in the file whatever the host
    /// byte order is.
    I32s(Vec<i32>),
}

/// Data blocks of a datafile that is being written.
#[derive(Clone, Debug, Default)]
pub struct DataPool {
    blocks: Vec<Block>,
}

impl DataPool {
    pub fn new() -> DataPool {
        Default::default()
    }
    pub fn add_data(&mut self, data: Vec<u8>) -> usize {
        self.blocks.push(Block::Bytes(data));
        self.blocks.len() - 1
    }
    pub fn add_data_swapped(&mut self, data: Vec<i32>) -> usize {
        self.blocks.push(Block::I32s(data));
        self.blocks.len() - 1
    }
    pub fn num_data(&self) -> usize {
        self.blocks.len()
    }
    /// Uncompressed size of a block in bytes.
    pub fn data_size(&self, index: usize) -> usize {
        match self.blocks[index] {
            Block::Bytes(ref b) => b.len(),
            Block::I32s(ref i) => i.len() * 4,
        }
    }
    /// Block contents as they go into the file, before compression.
    pub fn data(&self, index: usize) -> Cow<[u8]> {
        match self.blocks[index] {
            Block::Bytes(ref b) => Cow::Borrowed(b),
            Block::I32s(ref i) => {
                let mut bytes = Vec::new();
                format::extend_le_i32s(&mut bytes, i);
                Cow::Owned(bytes)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::DataPool;

    #[test]
    fn indices_and_sizes() {
        let mut pool = DataPool::new();
        assert_eq!(pool.add_data(b"abc".to_vec()), 0);
        assert_eq!(pool.add_data_swapped(vec![1, -2]), 1);
        assert_eq!(pool.add_data(Vec::new()), 2);
        assert_eq!(pool.num_data(), 3);
        assert_eq!(pool.data_size(1), 8);
        assert_eq!(&*pool.data(0), b"abc");
        assert_eq!(&*pool.data(1), &[1, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff]);
        assert!(pool.data(2).is_empty());
    }
}
