use std::{fmt, hash, marker::PhantomData};

use utility::id::{HasId, Id};

/// Identifies the upstream realtime feed an entity was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId(String);

impl FeedId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identifier scoped to the feed it was read from, generalizing the
/// teacher's `Id<Origin>` (which scopes identifiers by upstream data source
/// priority) to scope identifiers by upstream feed instead.
pub struct FeedScopedId<T: HasId>(FeedId, Id<T>, PhantomData<T>);

impl<T: HasId> FeedScopedId<T> {
    pub fn new(feed_id: FeedId, id: Id<T>) -> Self {
        Self(feed_id, id, PhantomData)
    }

    pub fn feed_id(&self) -> &FeedId {
        &self.0
    }

    pub fn id(&self) -> &Id<T> {
        &self.1
    }
}

impl<T: HasId> fmt::Debug for FeedScopedId<T>
where
    T::IdType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FeedScopedId").field(&self.0).field(&self.1).finish()
    }
}

impl<T: HasId> fmt::Display for FeedScopedId<T>
where
    T::IdType: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

impl<T: HasId> Clone for FeedScopedId<T>
where
    T::IdType: Clone,
{
    fn clone(&self) -> Self {
        Self(self.0.clone(), self.1.clone(), PhantomData)
    }
}

impl<T: HasId> hash::Hash for FeedScopedId<T>
where
    T::IdType: hash::Hash,
{
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
        self.1.hash(state);
    }
}

impl<T: HasId> PartialEq for FeedScopedId<T>
where
    T::IdType: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

impl<T: HasId> Eq for FeedScopedId<T> where T::IdType: Eq {}
