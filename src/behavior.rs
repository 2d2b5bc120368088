use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hash builder used by [`Hashed::new`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hash builder used by [`Hashed::new`].
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}

/// How the table copies in and releases values of type `T`.
///
/// The table never stores a caller's value directly: every insert goes through
/// [`copy`](ValueBehavior::copy), and every stored value leaves through
/// [`destroy`](ValueBehavior::destroy) exactly once, whether it is replaced,
/// deleted, or dropped with the table.
pub trait ValueBehavior<T> {
    /// Produces an owned copy of `original` for the table to store.
    fn copy(&self, original: &T) -> T;

    /// Releases a value the table owned.
    #[inline]
    fn destroy(&self, owned: T) {
        drop(owned);
    }
}

/// A [`ValueBehavior`] that additionally knows how to hash and compare keys.
///
/// Keys that compare equal under [`eq_key`](KeyBehavior::eq_key) must produce
/// the same [`hash_key`](KeyBehavior::hash_key). The table caches the hash of
/// every stored key and only consults `eq_key` on a hash match.
pub trait KeyBehavior<T>: ValueBehavior<T> {
    /// Hashes `key`.
    fn hash_key(&self, key: &T) -> u64;

    /// Returns `true` if `a` and `b` denote the same key.
    fn eq_key(&self, a: &T, b: &T) -> bool;
}

/// Value behavior for any `T: Clone`: copy is [`Clone::clone`], destroy is a
/// plain drop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cloned;

impl<T> ValueBehavior<T> for Cloned
where
    T: Clone,
{
    #[inline]
    fn copy(&self, original: &T) -> T {
        original.clone()
    }
}

/// Key behavior for any `T: Hash + Eq + Clone`, hashing through a
/// [`BuildHasher`].
#[derive(Debug, Default, Clone)]
pub struct Hashed<S> {
    hash_builder: S,
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl Hashed<DefaultHashBuilder> {
    /// Creates a key behavior using [`DefaultHashBuilder`].
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<S> Hashed<S> {
    /// Creates a key behavior hashing through `hash_builder`.
    pub const fn with_hasher(hash_builder: S) -> Self {
        Self { hash_builder }
    }

    /// Returns the hash builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }
}

impl<T, S> ValueBehavior<T> for Hashed<S>
where
    T: Clone,
{
    #[inline]
    fn copy(&self, original: &T) -> T {
        original.clone()
    }
}

impl<T, S> KeyBehavior<T> for Hashed<S>
where
    T: Hash + Eq + Clone,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &T) -> u64 {
        self.hash_builder.hash_one(key)
    }

    #[inline]
    fn eq_key(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// A key behavior assembled from plain functions.
///
/// Construction requires all four operations, so an incomplete key behavior
/// cannot reach a table.
pub struct FnKeyBehavior<T> {
    hash: fn(&T) -> u64,
    equal: fn(&T, &T) -> bool,
    copy: fn(&T) -> T,
    destroy: fn(T),
}

impl<T> FnKeyBehavior<T> {
    /// Bundles the four key operations.
    pub const fn new(
        hash: fn(&T) -> u64,
        equal: fn(&T, &T) -> bool,
        copy: fn(&T) -> T,
        destroy: fn(T),
    ) -> Self {
        Self {
            hash,
            equal,
            copy,
            destroy,
        }
    }
}

impl<T> Clone for FnKeyBehavior<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FnKeyBehavior<T> {}

impl<T> Debug for FnKeyBehavior<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnKeyBehavior")
            .field("hash", &(self.hash as *const ()))
            .field("equal", &(self.equal as *const ()))
            .field("copy", &(self.copy as *const ()))
            .field("destroy", &(self.destroy as *const ()))
            .finish()
    }
}

impl<T> ValueBehavior<T> for FnKeyBehavior<T> {
    #[inline]
    fn copy(&self, original: &T) -> T {
        (self.copy)(original)
    }

    #[inline]
    fn destroy(&self, owned: T) {
        (self.destroy)(owned)
    }
}

impl<T> KeyBehavior<T> for FnKeyBehavior<T> {
    #[inline]
    fn hash_key(&self, key: &T) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn eq_key(&self, a: &T, b: &T) -> bool {
        (self.equal)(a, b)
    }
}

/// A value behavior assembled from plain functions.
pub struct FnValueBehavior<T> {
    copy: fn(&T) -> T,
    destroy: fn(T),
}

impl<T> FnValueBehavior<T> {
    /// Bundles the copy and destroy operations.
    pub const fn new(copy: fn(&T) -> T, destroy: fn(T)) -> Self {
        Self { copy, destroy }
    }
}

impl<T> Clone for FnValueBehavior<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FnValueBehavior<T> {}

impl<T> Debug for FnValueBehavior<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnValueBehavior")
            .field("copy", &(self.copy as *const ()))
            .field("destroy", &(self.destroy as *const ()))
            .finish()
    }
}

impl<T> ValueBehavior<T> for FnValueBehavior<T> {
    #[inline]
    fn copy(&self, original: &T) -> T {
        (self.copy)(original)
    }

    #[inline]
    fn destroy(&self, owned: T) {
        (self.destroy)(owned)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use core::hash::BuildHasherDefault;

    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Pair {
        id: i32,
        name: String,
    }

    fn hash_pair(p: &Pair) -> u64 {
        p.id as u64 ^ p.name.len() as u64
    }

    fn eq_pair(a: &Pair, b: &Pair) -> bool {
        a.id == b.id && a.name == b.name
    }

    fn copy_pair(p: &Pair) -> Pair {
        p.clone()
    }

    #[test]
    fn fn_key_behavior_dispatches() {
        let kb = FnKeyBehavior::new(hash_pair, eq_pair, copy_pair, drop);
        let a = Pair {
            id: 7,
            name: "seven".to_string(),
        };
        let b = kb.copy(&a);
        assert_eq!(a, b);
        assert!(kb.eq_key(&a, &b));
        assert_eq!(kb.hash_key(&a), 7 ^ 5);
        kb.destroy(b);
    }

    #[test]
    fn hashed_agrees_with_build_hasher() {
        let kb: Hashed<BuildHasherDefault<SipHasher>> = Hashed::with_hasher(Default::default());
        let key = "probe".to_string();
        assert_eq!(kb.hash_key(&key), kb.hasher().hash_one(&key));
        assert!(kb.eq_key(&key, &kb.copy(&key)));
        assert!(!kb.eq_key(&key, &"other".to_string()));
    }

    #[test]
    fn cloned_copies() {
        let value = alloc::vec![1.5f64, 2.5];
        let copy = ValueBehavior::copy(&Cloned, &value);
        assert_eq!(copy, value);
    }
}
