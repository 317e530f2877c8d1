use itertools::Itertools;

use crate::model::EntityMetadata;

/// One section of a `.tsm` file: the header plus every key/value line up to
/// the next header. Keys repeat freely; accessors take the last occurrence.
#[derive(Clone, Debug)]
pub struct Block {
    pub kind: String,
    pub arg: Option<String>,
    /// 1-based line number of the header, the anchor for block-level issues.
    pub line: u32,
    entries: Vec<Entry>,
}

#[derive(Clone, Debug)]
struct Entry {
    key: String,
    value: String,
    line: u32,
}

impl Block {
    pub fn new(kind: String, arg: Option<String>, line: u32) -> Self {
        Block { kind, arg, line, entries: Vec::new() }
    }

    pub fn push(&mut self, key: String, value: String, line: u32) {
        self.entries.push(Entry { key, value, line });
    }

    /// Last value recorded under any spelling in the alias group.
    pub fn value(&self, aliases: &[&str]) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| aliases.contains(&e.key.as_str()))
            .map(|e| e.value.as_str())
    }

    /// Every value recorded under the alias group, in file order.
    pub fn values<'a>(&'a self, aliases: &'a [&str]) -> impl Iterator<Item = &'a str> {
        self.entries.iter().filter(|e| aliases.contains(&e.key.as_str())).map(|e| e.value.as_str())
    }

    pub fn has(&self, aliases: &[&str]) -> bool {
        self.value(aliases).is_some()
    }

    /// The block's identifier: an explicit `id =` wins over the header arg.
    pub fn id(&self) -> Option<&str> {
        self.value(super::keys::ID).or(self.arg.as_deref())
    }

    /// Line number of the last entry matching the alias group, for
    /// field-level diagnostics.
    pub fn line_of(&self, aliases: &[&str]) -> Option<u32> {
        self.entries.iter().rev().find(|e| aliases.contains(&e.key.as_str())).map(|e| e.line)
    }

    /// Entries whose key is in no recognized alias group, collected as
    /// entity metadata (last occurrence per key).
    pub fn metadata(&self, known: &[&[&str]]) -> EntityMetadata {
        self.entries
            .iter()
            .filter(|e| !known.iter().any(|aliases| aliases.contains(&e.key.as_str())))
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// `key = value` pairs in file order, deduplicated to the last
    /// occurrence per key.
    pub fn unique_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str()).unique()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::keys;

    fn sample() -> Block {
        let mut b = Block::new("cell".to_owned(), None, 3);
        b.push("x".to_owned(), "1".to_owned(), 4);
        b.push("width".to_owned(), "6".to_owned(), 5);
        b.push("lane_width".to_owned(), "8".to_owned(), 6);
        b.push("custom".to_owned(), "hello".to_owned(), 7);
        b
    }

    #[test]
    fn last_alias_occurrence_wins() {
        let b = sample();
        assert_eq!(b.value(keys::WIDTH), Some("8"));
        assert_eq!(b.line_of(keys::WIDTH), Some(6));
        assert_eq!(b.values(keys::WIDTH).collect::<Vec<_>>(), vec!["6", "8"]);
    }

    #[test]
    fn explicit_id_beats_header_arg() {
        let mut b = Block::new("sector".to_owned(), Some("pit".to_owned()), 1);
        assert_eq!(b.id(), Some("pit"));
        b.push("id".to_owned(), "paddock".to_owned(), 2);
        assert_eq!(b.id(), Some("paddock"));
    }

    #[test]
    fn unrecognized_keys_become_metadata() {
        let b = sample();
        let meta = b.metadata(&[keys::X, keys::Z, keys::WIDTH]);
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.get("custom").map(String::as_str), Some("hello"));
    }
}
