use std::collections::HashMap;

use crate::modules::traits::has_id::HasIdTrait;

/// collect an iterator of id carrying records into an id keyed map
pub trait AsMap<T: HasIdTrait>: Iterator<Item = T> + Sized {
    fn as_map(self) -> HashMap<i32, T> {
        self.map(|item| (item.get_id(), item)).collect()
    }
}

impl<T: HasIdTrait, I: Iterator<Item = T>> AsMap<T> for I {}
