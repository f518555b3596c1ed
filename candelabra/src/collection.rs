use crate::error::CandelabraError;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// `Vec` that always holds at least one element.
///
/// Derefs to a slice so the usual read-only slice API is available, while every mutating
/// operation is restricted to ones that preserve the invariant.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(try_from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(
    serialize = "T: Serialize + Clone",
    deserialize = "T: Deserialize<'de>"
))]
pub struct NonEmpty<T>(Vec<T>);

impl<T> NonEmpty<T> {
    /// Construct a [`NonEmpty`] containing a single element.
    pub fn one(value: T) -> Self {
        Self(vec![value])
    }

    /// Construct a [`NonEmpty`] from a first element followed by the rest.
    pub fn new(head: T, tail: impl IntoIterator<Item = T>) -> Self {
        let mut items = vec![head];
        items.extend(tail);
        Self(items)
    }

    /// Construct a [`NonEmpty`] from leading elements followed by a final element.
    pub fn from_init_last(init: Vec<T>, last: T) -> Self {
        let mut items = init;
        items.push(last);
        Self(items)
    }

    pub fn first(&self) -> &T {
        &self.0[0]
    }

    pub fn last(&self) -> &T {
        &self.0[self.0.len() - 1]
    }

    pub fn last_mut(&mut self) -> &mut T {
        let index = self.0.len() - 1;
        &mut self.0[index]
    }

    pub fn push(&mut self, value: T) {
        self.0.push(value)
    }

    /// Split into everything but the last element, and the last element.
    pub fn split_last(&self) -> (&[T], &T) {
        let last = self.0.len() - 1;
        (&self.0[..last], &self.0[last])
    }

    /// Retain only elements satisfying the predicate. The final element is always retained.
    pub fn retain_or_last<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&T) -> bool,
    {
        let len = self.0.len();
        let mut index = 0;
        self.0.retain(|item| {
            index += 1;
            index == len || predicate(item)
        });
    }

    /// Stable sort by a key extracted from each element.
    pub fn sort_by_key<K, F>(&mut self, f: F)
    where
        F: FnMut(&T) -> K,
        K: Ord,
    {
        self.0.sort_by_key(f)
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.0.iter_mut()
    }

    /// Apply a function to every element, preserving the invariant.
    pub fn map<U, F>(self, f: F) -> NonEmpty<U>
    where
        F: FnMut(T) -> U,
    {
        NonEmpty(self.0.into_iter().map(f).collect())
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for NonEmpty<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> TryFrom<Vec<T>> for NonEmpty<T> {
    type Error = CandelabraError;

    fn try_from(value: Vec<T>) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(CandelabraError::EmptyInput)
        } else {
            Ok(Self(value))
        }
    }
}

impl<T> From<NonEmpty<T>> for Vec<T> {
    fn from(value: NonEmpty<T>) -> Self {
        value.0
    }
}

impl<T> IntoIterator for NonEmpty<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a NonEmpty<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
