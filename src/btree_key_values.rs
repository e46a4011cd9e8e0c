use std::collections::{BTreeMap, VecDeque};

/// Ordered multimap: values are kept per key in insertion order and popped
/// from the smallest key first.
#[derive(Debug, Clone)]
pub struct BTreeKeyValues<K, V>
where
    K: Ord,
{
    btree: BTreeMap<K, VecDeque<V>>,
}

impl<K, V> Default for BTreeKeyValues<K, V>
where
    K: Ord,
{
    fn default() -> BTreeKeyValues<K, V> {
        BTreeKeyValues {
            btree: BTreeMap::new(),
        }
    }
}

impl<K, V> BTreeKeyValues<K, V>
where
    K: Ord,
{
    pub fn push_back(&mut self, key: K, value: V) {
        self.btree.entry(key).or_default().push_back(value);
    }

    pub fn pop_first_back(&mut self) -> Option<V> {
        loop {
            return match self.btree.pop_first() {
                None => None,
                Some((key, mut queue)) => {
                    let ret = match queue.pop_front() {
                        None => continue,
                        Some(x) => x,
                    };
                    if !queue.is_empty() {
                        self.btree.insert(key, queue);
                    }
                    Some(ret)
                }
            };
        }
    }
}

impl<K, V> From<BTreeKeyValues<K, V>> for Vec<V>
where
    K: Ord,
{
    fn from(mut map: BTreeKeyValues<K, V>) -> Self {
        let mut ret = vec![];
        while let Some(x) = map.pop_first_back() {
            ret.push(x);
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::BTreeKeyValues;
    use std::cmp::Reverse;

    #[test]
    fn test_drains_by_key_then_insertion_order() {
        let mut map = BTreeKeyValues::default();
        map.push_back(Reverse(2), "b0");
        map.push_back(Reverse(5), "a0");
        map.push_back(Reverse(2), "b1");
        map.push_back(Reverse(3), "c0");
        let drained: Vec<_> = map.into();
        assert_eq!(drained, vec!["a0", "c0", "b0", "b1"]);
    }

    #[test]
    fn test_pop_on_empty() {
        let mut map: BTreeKeyValues<u32, u32> = BTreeKeyValues::default();
        assert_eq!(map.pop_first_back(), None);
    }
}
