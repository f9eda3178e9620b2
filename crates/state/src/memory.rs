//! `Memory<V>` / `Relay<V>` — reference-counted, interior-mutable state cells.
//!
//! `Memory` owns a cell; every other handle to its value is a `Relay`, a pair
//! of closures (`get`, `set`) that may alias the cell directly or be a
//! transformed view (`map`, `read_only`, `constant`). Built on the same
//! `Arc<parking_lot::RwLock<_>>` idiom used for shared session state
//! elsewhere in the workspace, generalized to an arbitrary value type.

use std::sync::Arc;

use parking_lot::RwLock;

/// Internal backing for a `Relay<V>`. Transform views wrap an inner backing
/// of a different type, so `with_mut` threads through the original cell's
/// lock no matter how many `map`/`read_only` layers sit on top.
trait RelayBacking<V>: Send + Sync {
    fn get(&self) -> V;
    fn set(&self, value: V);
    fn with_mut(&self, f: &mut dyn FnMut(&mut V));
}

struct DirectBacking<V> {
    cell: Arc<RwLock<V>>,
}

impl<V: Clone + Send + Sync + 'static> RelayBacking<V> for DirectBacking<V> {
    fn get(&self) -> V {
        self.cell.read().clone()
    }

    fn set(&self, value: V) {
        *self.cell.write() = value;
    }

    fn with_mut(&self, f: &mut dyn FnMut(&mut V)) {
        f(&mut self.cell.write());
    }
}

struct MapBacking<V, U> {
    inner: Arc<dyn RelayBacking<V>>,
    forward: Arc<dyn Fn(V) -> U + Send + Sync>,
    inverse: Arc<dyn Fn(U) -> V + Send + Sync>,
}

impl<V, U> RelayBacking<U> for MapBacking<V, U>
where
    V: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn get(&self) -> U {
        (self.forward)(self.inner.get())
    }

    fn set(&self, value: U) {
        self.inner.set((self.inverse)(value));
    }

    fn with_mut(&self, f: &mut dyn FnMut(&mut U)) {
        self.inner.with_mut(&mut |v: &mut V| {
            let mut u = (self.forward)(v.clone());
            f(&mut u);
            *v = (self.inverse)(u);
        });
    }
}

struct ReadOnlyBacking<V, U> {
    inner: Arc<dyn RelayBacking<V>>,
    forward: Arc<dyn Fn(V) -> U + Send + Sync>,
}

impl<V, U> RelayBacking<U> for ReadOnlyBacking<V, U>
where
    V: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn get(&self) -> U {
        (self.forward)(self.inner.get())
    }

    // A read-only relay's `set`/`with_mut` are no-ops.
    fn set(&self, _value: U) {}

    fn with_mut(&self, _f: &mut dyn FnMut(&mut U)) {}
}

struct ConstantBacking<U> {
    value: U,
}

impl<U: Clone + Send + Sync + 'static> RelayBacking<U> for ConstantBacking<U> {
    fn get(&self) -> U {
        self.value.clone()
    }

    // A constant relay's `set`/`with_mut` are no-ops.
    fn set(&self, _value: U) {}

    fn with_mut(&self, _f: &mut dyn FnMut(&mut U)) {}
}

/// A typed accessor to a shared mutable cell. Cheap to clone; many `Relay`s
/// may alias one `Memory`.
pub struct Relay<V> {
    backing: Arc<dyn RelayBacking<V>>,
}

impl<V> Clone for Relay<V> {
    fn clone(&self) -> Self {
        Self {
            backing: self.backing.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Relay<V> {
    fn from_backing(backing: Arc<dyn RelayBacking<V>>) -> Self {
        Self { backing }
    }

    /// Read the current value.
    pub fn get(&self) -> V {
        self.backing.get()
    }

    /// Overwrite the current value. A no-op on constant/read-only relays.
    pub fn set(&self, value: V) {
        self.backing.set(value);
    }

    /// Atomic read-modify-write: takes the backing cell's lock for the full
    /// operation, so concurrent `Relay` operations on the same `Memory`
    /// observe a single linearizable order.
    pub fn with_mut(&self, mut f: impl FnMut(&mut V)) {
        self.backing.with_mut(&mut f);
    }

    /// A read-write transformed view through `forward`/`inverse`.
    pub fn map<U>(
        &self,
        forward: impl Fn(V) -> U + Send + Sync + 'static,
        inverse: impl Fn(U) -> V + Send + Sync + 'static,
    ) -> Relay<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        Relay::from_backing(Arc::new(MapBacking {
            inner: self.backing.clone(),
            forward: Arc::new(forward),
            inverse: Arc::new(inverse),
        }))
    }

    /// A read-only transformed view; `set`/`with_mut` become no-ops.
    pub fn read_only<U>(&self, forward: impl Fn(V) -> U + Send + Sync + 'static) -> Relay<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        Relay::from_backing(Arc::new(ReadOnlyBacking {
            inner: self.backing.clone(),
            forward: Arc::new(forward),
        }))
    }
}

impl<V: Clone + Send + Sync + 'static> Relay<V> {
    /// A relay that always returns `value` and ignores writes.
    pub fn constant(value: V) -> Self {
        Relay::from_backing(Arc::new(ConstantBacking { value }))
    }
}

/// The unique owner of a cell. All access outside `Memory` itself goes
/// through a `Relay`.
pub struct Memory<V> {
    cell: Arc<RwLock<V>>,
}

impl<V: Clone + Send + Sync + 'static> Memory<V> {
    pub fn new(value: V) -> Self {
        Self {
            cell: Arc::new(RwLock::new(value)),
        }
    }

    /// Read the current value without going through a `Relay`.
    pub fn get(&self) -> V {
        self.cell.read().clone()
    }

    /// Overwrite the current value without going through a `Relay`.
    pub fn set(&self, value: V) {
        *self.cell.write() = value;
    }

    /// Mint a `Relay` aliasing this cell directly.
    pub fn relay(&self) -> Relay<V> {
        Relay::from_backing(Arc::new(DirectBacking {
            cell: self.cell.clone(),
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Type-specific affordances
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Affordances for sequence-typed relays.
pub trait RelaySeqExt<T> {
    fn append(&self, item: T);
    fn append_all(&self, items: impl IntoIterator<Item = T>);
    fn clear(&self);
}

impl<T: Clone + Send + Sync + 'static> RelaySeqExt<T> for Relay<Vec<T>> {
    fn append(&self, item: T) {
        self.with_mut(|v| v.push(item.clone()));
    }

    fn append_all(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        self.with_mut(|v| v.extend(items.clone()));
    }

    fn clear(&self) {
        self.with_mut(|v| v.clear());
    }
}

/// Affordances for set-typed relays.
pub trait RelaySetExt<T> {
    fn contains(&self, item: &T) -> bool;
    fn insert(&self, item: T) -> bool;
    fn remove(&self, item: &T) -> bool;
    fn form_union(&self, other: std::collections::HashSet<T>);
}

impl<T> RelaySetExt<T> for Relay<std::collections::HashSet<T>>
where
    T: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
{
    fn contains(&self, item: &T) -> bool {
        self.get().contains(item)
    }

    fn insert(&self, item: T) -> bool {
        let mut inserted = false;
        self.with_mut(|set| inserted = set.insert(item.clone()));
        inserted
    }

    fn remove(&self, item: &T) -> bool {
        let mut removed = false;
        self.with_mut(|set| removed = set.remove(item));
        removed
    }

    fn form_union(&self, other: std::collections::HashSet<T>) {
        self.with_mut(|set| set.extend(other.iter().cloned()));
    }
}

/// Affordances for integer-typed relays.
pub trait RelayIntExt {
    fn increment(&self) -> Self::Out;
    fn decrement(&self) -> Self::Out;
    fn add_delta(&self, delta: Self::Out) -> Self::Out;
    type Out;
}

macro_rules! impl_relay_int_ext {
    ($t:ty) => {
        impl RelayIntExt for Relay<$t> {
            type Out = $t;

            fn increment(&self) -> $t {
                self.add_delta(1)
            }

            fn decrement(&self) -> $t {
                self.add_delta(-1)
            }

            fn add_delta(&self, delta: $t) -> $t {
                let mut result = 0 as $t;
                self.with_mut(|v| {
                    *v = v.wrapping_add(delta);
                    result = *v;
                });
                result
            }
        }
    };
}

impl_relay_int_ext!(i32);
impl_relay_int_ext!(i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_and_relay_share_the_same_cell() {
        let mem = Memory::new(1_i64);
        let r1 = mem.relay();
        let r2 = mem.relay();
        r1.set(42);
        assert_eq!(r2.get(), 42);
        assert_eq!(mem.get(), 42);
    }

    #[test]
    fn map_view_round_trips() {
        let mem = Memory::new(10_i64);
        let relay = mem.relay();
        let doubled = relay.map(|v| v * 2, |v| v / 2);
        assert_eq!(doubled.get(), 20);
        doubled.set(100);
        assert_eq!(relay.get(), 50);
    }

    #[test]
    fn read_only_view_ignores_writes() {
        let mem = Memory::new(1_i64);
        let relay = mem.relay();
        let view = relay.read_only(|v| v.to_string());
        view.set("ignored".into());
        assert_eq!(relay.get(), 1);
        assert_eq!(view.get(), "1");
    }

    #[test]
    fn constant_relay_ignores_writes() {
        let relay: Relay<i64> = Relay::constant(7);
        relay.set(99);
        assert_eq!(relay.get(), 7);
    }

    #[test]
    fn seq_affordances() {
        let mem: Memory<Vec<i32>> = Memory::new(Vec::new());
        let relay = mem.relay();
        relay.append(1);
        relay.append_all([2, 3]);
        assert_eq!(relay.get(), vec![1, 2, 3]);
        relay.clear();
        assert!(relay.get().is_empty());
    }

    #[test]
    fn set_affordances() {
        let mem: Memory<std::collections::HashSet<String>> = Memory::new(Default::default());
        let relay = mem.relay();
        assert!(relay.insert("a".into()));
        assert!(!relay.insert("a".into()));
        assert!(relay.contains(&"a".into()));
        assert!(relay.remove(&"a".into()));
        assert!(!relay.contains(&"a".into()));
    }

    #[test]
    fn int_affordances() {
        let mem = Memory::new(0_i64);
        let relay = mem.relay();
        assert_eq!(relay.increment(), 1);
        assert_eq!(relay.increment(), 2);
        assert_eq!(relay.decrement(), 1);
        assert_eq!(relay.add_delta(10), 11);
    }

    #[test]
    fn map_through_read_only_still_ignores_writes() {
        let mem = Memory::new(5_i64);
        let relay = mem.relay();
        let ro = relay.read_only(|v| v);
        let mapped = ro.map(|v| v * 2, |v| v / 2);
        mapped.set(1000);
        assert_eq!(mem.get(), 5);
    }
}
