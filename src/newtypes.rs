//! Index newtypes and index-keyed vectors used to give every linker-owned
//! entity a stable handle.

use std::{fmt, hash, marker::PhantomData, ops};

use derive_where::derive_where;

// === Index === //

pub trait Index: 'static + Sized + fmt::Debug + Copy + hash::Hash + Eq + Ord {
    fn try_from_usize(idx: usize) -> Option<Self>;

    fn from_usize(idx: usize) -> Self {
        Self::try_from_usize(idx).unwrap()
    }

    fn as_usize(self) -> usize;
}

#[macro_export]
macro_rules! define_index {
    ($(
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty;
    )*) => {$(
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
        $vis struct $name(pub $ty);

        impl $crate::newtypes::Index for $name {
            fn try_from_usize(idx: ::std::primitive::usize) -> ::std::option::Option<Self> {
                <$ty as ::std::convert::TryFrom<::std::primitive::usize>>::try_from(idx)
                    .ok()
                    .map(Self)
            }

            fn as_usize(self) -> ::std::primitive::usize {
                self.0 as ::std::primitive::usize
            }
        }
    )*};
}

// === IndexVec === //

#[derive_where(Debug, Clone; V)]
#[derive_where(Default)]
pub struct IndexVec<K, V> {
    pub raw: Vec<V>,
    _ty: PhantomData<fn(K) -> K>,
}

impl<K: Index, V> IndexVec<K, V> {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            _ty: PhantomData,
        }
    }

    pub fn push(&mut self, value: V) -> K {
        let key = K::from_usize(self.raw.len());
        self.raw.push(value);
        key
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get(&self, idx: K) -> Option<&V> {
        self.raw.get(idx.as_usize())
    }

    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.raw.len()).map(K::from_usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.raw.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.raw.iter_mut()
    }

    pub fn enumerate(&self) -> impl Iterator<Item = (K, &V)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_usize(i), v))
    }
}

impl<K: Index, V> ops::Index<K> for IndexVec<K, V> {
    type Output = V;

    fn index(&self, index: K) -> &Self::Output {
        &self.raw[index.as_usize()]
    }
}

impl<K: Index, V> ops::IndexMut<K> for IndexVec<K, V> {
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.raw[index.as_usize()]
    }
}

impl<'a, K: Index, V> IntoIterator for &'a IndexVec<K, V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.raw.iter()
    }
}
