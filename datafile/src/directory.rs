use common::MapIterator;
use std::ops;

use crate::format;
use crate::format::ItemView;

#[derive(Clone, Copy, Debug)]
struct ItemType {
    type_id: u16,
    start: usize,
    num: usize,
}

#[derive(Clone, Debug)]
struct Item {
    type_id: u16,
    id: u16,
    data: Vec<i32>,
}

/// In-memory item directory of a datafile that is being written.
///
/// Item types are kept sorted by type id and the items of each type sorted
/// by id, which is the order they're laid out in the file.
#[derive(Clone, Debug, Default)]
pub struct ItemDirectory {
    item_types: Vec<ItemType>,
    items: Vec<Item>,
}

pub type Items<'a> = MapIterator<ItemView<'a>, &'a ItemDirectory, ops::Range<usize>>;
pub type ItemTypes<'a> = MapIterator<u16, &'a ItemDirectory, ops::Range<usize>>;
pub type ItemTypeItems<'a> = MapIterator<ItemView<'a>, &'a ItemDirectory, ops::Range<usize>>;

impl ItemDirectory {
    pub fn new() -> ItemDirectory {
        Default::default()
    }

    fn get_item_type_index(&self, type_id: u16) -> (usize, bool) {
        match self.item_types.binary_search_by_key(&type_id, |t| t.type_id) {
            Ok(i) => (i, true),
            Err(i) => (i, false),
        }
    }

    fn get_item_index(&self, item_type_index: usize, item_type_found: bool, id: u16) -> (usize, bool) {
        if !item_type_found {
            if item_type_index != self.item_types.len() {
                (self.item_types[item_type_index].start, false)
            } else {
                (self.items.len(), false)
            }
        } else {
            let ItemType { start, num, .. } = self.item_types[item_type_index];
            match self.items[start..][..num].binary_search_by_key(&id, |i| i.id) {
                Ok(i) => (start + i, true),
                Err(i) => (start + i, false),
            }
        }
    }

    pub fn item_type(&self, index: usize) -> u16 {
        self.item_types[index].type_id
    }
    pub fn num_item_types(&self) -> usize {
        self.item_types.len()
    }
    pub fn item(&self, index: usize) -> ItemView {
        let Item { type_id, id, ref data } = self.items[index];
        ItemView { type_id, id, data }
    }
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// `(type_id, start, num)` of every item type, in file order.
    pub fn item_type_ranges(&self) -> impl Iterator<Item = (u16, usize, usize)> + '_ {
        self.item_types.iter().map(|t| (t.type_id, t.start, t.num))
    }

    pub fn item_type_indices(&self, type_id: u16) -> ops::Range<usize> {
        let (type_index, type_found) = self.get_item_type_index(type_id);
        if !type_found {
            return 0..0;
        }
        let item_type = self.item_types[type_index];
        item_type.start..item_type.start + item_type.num
    }

    pub fn find_item(&self, type_id: u16, id: u16) -> Option<ItemView> {
        let (type_index, type_found) = self.get_item_type_index(type_id);
        match self.get_item_index(type_index, type_found, id) {
            (index, true) => Some(self.item(index)),
            (_, false) => None,
        }
    }

    /// Size of the item section in bytes, item headers included.
    pub fn size(&self) -> usize {
        self.items
            .iter()
            .map(|i| format::ITEM_HEADER_SIZE + i.data.len() * 4)
            .sum()
    }

    pub fn items(&self) -> Items {
        fn map_fn<'a>(i: usize, self_: &mut &'a ItemDirectory) -> ItemView<'a> {
            self_.item(i)
        }
        MapIterator::new(self, 0..self.num_items(), map_fn)
    }

    pub fn item_types(&self) -> ItemTypes {
        fn map_fn(i: usize, self_: &mut &ItemDirectory) -> u16 {
            self_.item_type(i)
        }
        MapIterator::new(self, 0..self.num_item_types(), map_fn)
    }

    pub fn item_type_items(&self, type_id: u16) -> ItemTypeItems {
        fn map_fn<'a>(i: usize, self_: &mut &'a ItemDirectory) -> ItemView<'a> {
            self_.item(i)
        }
        MapIterator::new(self, self.item_type_indices(type_id), map_fn)
    }

    /// Adds an item. `(type_id, id)` must not be present yet.
    pub fn add_item(&mut self, type_id: u16, id: u16, data: &[i32]) -> Result<(), format::Error> {
        let (type_index, type_found) = self.get_item_type_index(type_id);
        let (item_index, item_found) = self.get_item_index(type_index, type_found, id);

        if item_found {
            error!("duplicate item, type_id={} id={}", type_id, id);
            return Err(format::Error::DuplicateItem { type_id, id });
        }

        if !type_found {
            self.item_types.insert(type_index, ItemType {
                type_id,
                start: item_index,
                num: 0,
            });
        }
        self.item_types[type_index].num += 1;
        for t in self.item_types.iter_mut().skip(type_index + 1) {
            t.start += 1;
        }

        self.items.insert(item_index, Item {
            type_id,
            id,
            data: data.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::ItemDirectory;
    use crate::format::Error;

    #[test]
    fn sorted_by_type_and_id() {
        let mut dir = ItemDirectory::new();
        dir.add_item(5, 1, &[51]).unwrap();
        dir.add_item(2, 0, &[20]).unwrap();
        dir.add_item(5, 0, &[50]).unwrap();
        dir.add_item(0xfffe, 0, &[]).unwrap();
        dir.add_item(2, 1, &[21, 22]).unwrap();

        assert_eq!(dir.item_types().collect::<Vec<_>>(), [2, 5, 0xfffe]);
        let ids: Vec<_> = dir.items().map(|i| (i.type_id, i.id)).collect();
        assert_eq!(ids, [(2, 0), (2, 1), (5, 0), (5, 1), (0xfffe, 0)]);
        assert_eq!(dir.item_type_indices(5), 2..4);
        assert_eq!(dir.item_type_indices(3), 0..0);
        assert_eq!(dir.find_item(2, 1).unwrap().data, [21, 22]);
        assert!(dir.find_item(2, 2).is_none());
        assert_eq!(dir.size(), 5 * 8 + 6 * 4);
    }

    #[test]
    fn duplicate() {
        let mut dir = ItemDirectory::new();
        dir.add_item(1, 0, &[1]).unwrap();
        assert_eq!(
            dir.add_item(1, 0, &[2]),
            Err(Error::DuplicateItem { type_id: 1, id: 0 }),
        );
        assert_eq!(dir.find_item(1, 0).unwrap().data, [1]);
        assert_eq!(dir.num_items(), 1);
    }
}
