//! CGI-style parameter sets

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::iter::FromIterator;

/// A map of FastCGI parameters
///
/// This is a newtype around a `BTreeMap<Vec<u8>, Vec<u8>>`. Names and values
/// are arbitrary bytes. Iteration, and therefore the order on the wire, is
/// lexical by name; responders don't depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    map: BTreeMap<Vec<u8>, Vec<u8>>
}

impl Params {
    pub fn new() -> Params {
        Params {
            map: BTreeMap::new()
        }
    }

    /// Sets a parameter, replacing any earlier value under the same name
    pub fn insert<N, V>(&mut self, name: N, value: V) -> Option<Vec<u8>>
        where N: Into<Vec<u8>>, V: Into<Vec<u8>>
    {
        self.map.insert(name.into(), value.into())
    }

    pub fn get<N: AsRef<[u8]>>(&self, name: N) -> Option<&[u8]> {
        self.map.get(name.as_ref()).map(Vec::as_slice)
    }

    /// Adds every pair of `other`, with `other` winning on conflicts
    pub fn extend_from(&mut self, other: &Params) {
        for (name, value) in other {
            self.map.insert(name.clone(), value.clone());
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Vec<u8>> {
        self.map.iter()
    }
}

impl<N, V> FromIterator<(N, V)> for Params
    where N: Into<Vec<u8>>, V: Into<Vec<u8>>
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Params {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (Vec<u8>, Vec<u8>);
    type IntoIter = btree_map::IntoIter<Vec<u8>, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a Vec<u8>, &'a Vec<u8>);
    type IntoIter = btree_map::Iter<'a, Vec<u8>, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
