/// Iterator that maps indices through a function that also gets access to
/// some shared state, usually the container the indices point into.
pub struct MapIterator<T, D, I: Iterator> {
    data: D,
    iterator: I,
    // `map` is already a method of `Iterator`, so it can't be the field name.
    map_fn: fn(I::Item, &mut D) -> T,
}

impl<T, D, I: Iterator> MapIterator<T, D, I> {
    pub fn new(data: D, iterator: I, map_fn: fn(I::Item, &mut D) -> T) -> MapIterator<T, D, I> {
        MapIterator {
            data,
            iterator,
            map_fn,
        }
    }
}

impl<T, D, I: Iterator> Iterator for MapIterator<T, D, I> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        let map_fn = self.map_fn;
        self.iterator.next().map(|x| map_fn(x, &mut self.data))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iterator.size_hint()
    }
}

impl<T, D, I: ExactSizeIterator> ExactSizeIterator for MapIterator<T, D, I> {}

impl<T, D, I: DoubleEndedIterator> DoubleEndedIterator for MapIterator<T, D, I> {
    fn next_back(&mut self) -> Option<T> {
        let map_fn = self.map_fn;
        self.iterator.next_back().map(|x| map_fn(x, &mut self.data))
    }
}

#[cfg(test)]
mod test {
    use super::MapIterator;

    #[test]
    fn indices_into_slice() {
        fn map_fn(i: usize, data: &mut &[u32]) -> u32 {
            data[i] * 2
        }
        let data: &[u32] = &[1, 2, 3, 4];
        let iter = MapIterator::new(data, 1..3, map_fn);
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.rev().collect::<Vec<_>>(), [6, 4]);
    }
}
