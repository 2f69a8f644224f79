//! Keyed string storage with integer handles
//!
//! The macro table and the per-expansion argument tables are both
//! instances of [`Storage`]. Keys are read straight off the stream:
//! either as a whole identifier-shaped lexeme, or — for encoded macro
//! bodies — by longest match against the stored keys, which is what lets
//! mask tokens sit flush against surrounding text.

use crate::stream::Stream;
use std::collections::HashMap;

/// Directive keywords occupy the reserved handle range `0..KEYWORD_COUNT`
const KEYWORDS: [&str; 16] = [
    "#line", "#include", "#define", "#set", "#undef", "#eval", "#if", "#ifdef", "#ifndef",
    "#elif", "#else", "#endif", "#macro", "#endm", "#while", "#endw",
];

pub const KW_LINE: usize = 0;
pub const KW_INCLUDE: usize = 1;
pub const KW_DEFINE: usize = 2;
pub const KW_SET: usize = 3;
pub const KW_UNDEF: usize = 4;
pub const KEYWORD_COUNT: usize = KEYWORDS.len();

pub fn is_keyword(index: usize) -> bool {
    index < KEYWORD_COUNT
}

pub fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

pub fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    value: Option<String>,
    args: usize,
}

#[derive(Debug, Default)]
pub struct Storage {
    map: HashMap<String, usize>,
    entries: Vec<Entry>,
    last_read: String,
}

impl Storage {
    /// Storage with the directive keywords pre-registered
    pub fn new() -> Self {
        let mut storage = Self::new_bare();
        for keyword in KEYWORDS {
            storage.add(keyword);
        }
        storage
    }

    /// Empty storage for macro parameters and argument masks
    pub fn new_bare() -> Self {
        Self::default()
    }

    /// Most recent lexeme consumed by a read operation
    pub fn last_read(&self) -> &str {
        &self.last_read
    }

    /// Read a lexeme: optional leading `#`, then identifier characters
    fn read_lexeme(&mut self, io: &mut Stream) -> String {
        let mut lexeme = String::new();
        match io.scan_char() {
            Some('#') => lexeme.push('#'),
            Some(ch) if is_ident_start(ch) => lexeme.push(ch),
            Some(ch) => {
                io.unscan_char(ch);
                return lexeme;
            }
            None => return lexeme,
        }
        loop {
            match io.scan_char() {
                Some(ch) if is_ident_continue(ch) => lexeme.push(ch),
                Some(ch) => {
                    io.unscan_char(ch);
                    break;
                }
                None => break,
            }
        }
        lexeme
    }

    /// Read a whole lexeme and look it up
    pub fn search(&mut self, io: &mut Stream) -> Option<usize> {
        let lexeme = self.read_lexeme(io);
        self.last_read = lexeme;
        self.map.get(&self.last_read).copied()
    }

    /// Read the longest stored key starting at the cursor; the unread
    /// tail of the lexeme is pushed back. Falls back to the whole lexeme
    /// (not found) when no key is a prefix.
    pub fn search_longest(&mut self, io: &mut Stream) -> Option<usize> {
        let lexeme = self.read_lexeme(io);
        let boundaries: Vec<usize> = lexeme
            .char_indices()
            .map(|(i, _)| i)
            .skip(1)
            .chain(std::iter::once(lexeme.len()))
            .collect();
        for &end in boundaries.iter().rev() {
            if let Some(&index) = self.map.get(&lexeme[..end]) {
                io.unscan_str(&lexeme[end..]);
                self.last_read = lexeme[..end].to_string();
                return Some(index);
            }
        }
        self.last_read = lexeme;
        None
    }

    /// Read a lexeme and add it; `None` means it already exists
    pub fn add_by_reader(&mut self, io: &mut Stream) -> Option<usize> {
        let lexeme = self.read_lexeme(io);
        self.last_read = lexeme.clone();
        if self.map.contains_key(&lexeme) {
            return None;
        }
        Some(self.insert(lexeme))
    }

    /// Add a key directly; returns the existing handle on a repeat add
    pub fn add(&mut self, key: &str) -> usize {
        if let Some(&index) = self.map.get(key) {
            return index;
        }
        self.insert(key.to_string())
    }

    fn insert(&mut self, key: String) -> usize {
        let index = self.entries.len();
        self.map.insert(key.clone(), index);
        self.entries.push(Entry {
            key,
            value: None,
            args: 0,
        });
        index
    }

    pub fn get_index(&self, key: &str) -> Option<usize> {
        self.map.get(key).copied()
    }

    pub fn get_by_index(&self, index: usize) -> Option<&str> {
        self.entries.get(index)?.value.as_deref()
    }

    pub fn set_by_index(&mut self, index: usize, value: &str) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.value = Some(value.to_string());
        }
    }

    pub fn get_args_by_index(&self, index: usize) -> usize {
        self.entries.get(index).map_or(0, |entry| entry.args)
    }

    pub fn set_args_by_index(&mut self, index: usize, args: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.args = args;
        }
    }

    /// Remove an entry; a `None` handle is a silent no-op
    pub fn remove_by_index(&mut self, index: Option<usize>) {
        if let Some(index) = index {
            if let Some(entry) = self.entries.get_mut(index) {
                self.map.remove(&entry.key);
                entry.value = None;
                entry.args = 0;
            }
        }
    }

    /// Spelling of the key behind a handle
    pub fn to_string(&self, index: usize) -> String {
        self.entries
            .get(index)
            .map(|entry| entry.key.clone())
            .unwrap_or_default()
    }
}
