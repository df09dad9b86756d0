use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Numeric identifier tagged with the entity it belongs to.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Id<T> {
    pub id: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: u64) -> Self {
        Id { id, _marker: PhantomData }
    }

    /// The identifier following this one.
    pub fn next(&self) -> Self {
        Id::new(self.id + 1)
    }
}

// Manual impls: derives would require `T: Clone`/`T: Copy` of the tag.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for u64 {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct DataUnitTag;

pub type DataUnitId = Id<DataUnitTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_uses_tag_name() {
        let id = DataUnitId::new(7);

        assert_eq!(format!("{:?}", id), "DataUnitId: 7");
        assert_eq!(id.next(), DataUnitId::new(8));
        assert_eq!(u64::from(id), 7);
    }
}
