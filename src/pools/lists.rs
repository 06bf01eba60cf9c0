//! Deduplicating pools for list-valued route attributes
//!
//! AS paths and community lists repeat heavily across a route server's table. A pool
//! keeps one shared instance per distinct list: the first caller to present a list
//! donates its allocation, every later caller with an equal list (same elements, same
//! order) gets that instance back and its own copy is dropped.
//!
//! Lists are stored in a trie with one level per list element. Children are kept in a
//! plain vector and searched linearly; the fan-out below any node is bounded by the
//! number of distinct values following a given prefix, which is small for BGP data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A trie node keyed by one list element
struct Node<K, P> {
    key: K,
    children: Vec<Node<K, P>>,
    /// Shared instance of the list ending at this node
    list: Option<P>,
}

impl<K, P> Node<K, P> {
    fn new(key: K) -> Self {
        Self {
            key,
            children: Vec::new(),
            list: None,
        }
    }
}

struct Trie<K, P> {
    root: Vec<Node<K, P>>,
    /// Number of lists attached to terminal nodes
    len: usize,
}

impl<K: Eq + Clone, P: Clone> Trie<K, P> {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            len: 0,
        }
    }

    fn child_index(level: &mut Vec<Node<K, P>>, key: &K) -> usize {
        match level.iter().position(|node| node.key == *key) {
            Some(idx) => idx,
            None => {
                level.push(Node::new(key.clone()));
                level.len() - 1
            }
        }
    }

    /// Walk (and extend) the trie along `keys`, attaching `list` at the terminal node
    /// unless an instance is already present there. `keys` must not be empty.
    fn acquire(&mut self, keys: &[K], list: P) -> Option<P> {
        let (last, init) = keys.split_last()?;

        let mut level = &mut self.root;
        for key in init {
            let idx = Self::child_index(level, key);
            level = &mut level[idx].children;
        }

        let idx = Self::child_index(level, last);
        let terminal = &mut level[idx];
        if terminal.list.is_none() {
            self.len += 1;
        }
        Some(terminal.list.get_or_insert(list).clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The trie only ever grows; entries present before a panic remain valid.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// List pool
// =============================================================================

/// Pool for lists whose elements can directly key the trie
pub struct ListPool<T> {
    trie: Mutex<Trie<T, Arc<[T]>>>,
    empty: Arc<[T]>,
}

/// Pool for lists of integers, e.g. AS paths
pub type IntList = ListPool<u32>;

impl<T: Eq + Clone> ListPool<T> {
    pub fn new() -> Self {
        Self {
            trie: Mutex::new(Trie::new()),
            empty: Arc::from(Vec::new()),
        }
    }

    /// Get the shared instance of `list`.
    ///
    /// Equal lists always yield the same allocation (`Arc::ptr_eq`); lists that differ
    /// only in element order are distinct. The empty list maps to one fixed instance.
    pub fn acquire(&self, list: impl Into<Arc<[T]>>) -> Arc<[T]> {
        let list = list.into();
        if list.is_empty() {
            return Arc::clone(&self.empty);
        }
        lock(&self.trie)
            .acquire(&list, Arc::clone(&list))
            .unwrap_or(list)
    }

    /// Number of distinct non-empty lists held by the pool
    pub fn len(&self) -> usize {
        lock(&self.trie).len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Eq + Clone> Default for ListPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// String list pool
// =============================================================================

struct StringTrie {
    trie: Trie<u32, Arc<[String]>>,
    /// Interned string values; ids are handed out in first-seen order
    ids: HashMap<String, u32>,
    head: u32,
}

impl StringTrie {
    fn id(&mut self, value: &str) -> u32 {
        if let Some(id) = self.ids.get(value) {
            return *id;
        }
        self.head += 1;
        self.ids.insert(value.to_string(), self.head);
        self.head
    }
}

/// Pool for lists of strings.
///
/// Strings are first mapped to integer ids, the id sequence is used to walk the trie,
/// and the original string list is what gets stored and returned.
pub struct StringList {
    inner: Mutex<StringTrie>,
    empty: Arc<[String]>,
}

impl StringList {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StringTrie {
                trie: Trie::new(),
                ids: HashMap::new(),
                head: 0,
            }),
            empty: Arc::from(Vec::new()),
        }
    }

    /// Get the shared instance of `list`; see [`ListPool::acquire`].
    pub fn acquire(&self, list: impl Into<Arc<[String]>>) -> Arc<[String]> {
        let list = list.into();
        if list.is_empty() {
            return Arc::clone(&self.empty);
        }

        let mut inner = lock(&self.inner);
        let keys: Vec<u32> = list.iter().map(|s| inner.id(s)).collect();
        inner
            .trie
            .acquire(&keys, Arc::clone(&list))
            .unwrap_or(list)
    }

    /// Number of distinct non-empty lists held by the pool
    pub fn len(&self) -> usize {
        lock(&self.inner).trie.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct string values seen so far
    pub fn values(&self) -> usize {
        lock(&self.inner).ids.len()
    }
}

impl Default for StringList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Community;
    use std::thread;

    #[test]
    fn test_int_list_identity() {
        let pool = IntList::new();

        let a = pool.acquire(vec![23, 42, 1337]);
        let b = pool.acquire(vec![23, 42, 1337]);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, &[23, 42, 1337]);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_int_list_order_matters() {
        let pool = IntList::new();

        let a = pool.acquire(vec![1, 2, 3]);
        let b = pool.acquire(vec![3, 2, 1]);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(&*b, &[3, 2, 1]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_int_list_prefix_lists() {
        let pool = IntList::new();

        // A list that is a prefix of an already stored one gets its own instance
        let long = pool.acquire(vec![1, 2, 3]);
        let short = pool.acquire(vec![1, 2]);
        assert!(!Arc::ptr_eq(&long, &short));
        assert_eq!(&*short, &[1, 2]);
        assert!(Arc::ptr_eq(&short, &pool.acquire(vec![1, 2])));
        assert!(Arc::ptr_eq(&long, &pool.acquire(vec![1, 2, 3])));
    }

    #[test]
    fn test_int_list_keeps_first_instance() {
        let pool = IntList::new();

        let first: Arc<[u32]> = Arc::from(vec![64500, 64501]);
        let stored = pool.acquire(Arc::clone(&first));
        assert!(Arc::ptr_eq(&first, &stored));

        let second: Arc<[u32]> = Arc::from(vec![64500, 64501]);
        let again = pool.acquire(Arc::clone(&second));
        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&second, &again));
    }

    #[test]
    fn test_empty_lists() {
        let pool = IntList::new();
        let a = pool.acquire(Vec::<u32>::new());
        let b = pool.acquire(Vec::<u32>::new());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_empty());
        assert!(pool.is_empty());

        let strings = StringList::new();
        let a = strings.acquire(Vec::<String>::new());
        let b = strings.acquire(Vec::<String>::new());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(strings.is_empty());
    }

    #[test]
    fn test_community_list_pool() {
        let pool: ListPool<Community> = ListPool::new();

        let a = pool.acquire(vec![Community(65000, 1), Community(65000, 2)]);
        let b = pool.acquire(vec![Community(65000, 1), Community(65000, 2)]);
        let c = pool.acquire(vec![Community(65000, 2), Community(65000, 1)]);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_string_list_identity() {
        let pool = StringList::new();

        let a = pool.acquire(vec!["rt:65000:1".to_string(), "ro:65000:2".to_string()]);
        let b = pool.acquire(vec!["rt:65000:1".to_string(), "ro:65000:2".to_string()]);
        let c = pool.acquire(vec!["ro:65000:2".to_string(), "rt:65000:1".to_string()]);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(&*a, &["rt:65000:1".to_string(), "ro:65000:2".to_string()]);
        assert_eq!(pool.values(), 2);
    }

    #[test]
    fn test_string_list_first_seen_wins() {
        let pool = StringList::new();

        let a = pool.acquire(vec!["foo".to_string(), "bar".to_string()]);

        // Intern unrelated values in between
        pool.acquire(vec!["baz".to_string()]);
        pool.acquire(vec!["qux".to_string(), "foo".to_string()]);

        let b = pool.acquire(vec!["foo".to_string(), "bar".to_string()]);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.values(), 4);
    }

    #[test]
    fn test_concurrent_acquire() {
        let pool = Arc::new(IntList::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    (0..200u32)
                        .map(|i| pool.acquire(vec![64500, i % 10, 64501]))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<Arc<[u32]>>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(pool.len(), 10);
        for lists in &results {
            for (i, list) in lists.iter().enumerate() {
                let canonical = pool.acquire(vec![64500, i as u32 % 10, 64501]);
                assert!(Arc::ptr_eq(list, &canonical));
            }
        }
    }
}
