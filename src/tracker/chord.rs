//! Key identities and the chord labels key presses are counted under.
//!
//! A chord label is the key press together with the modifiers held at that moment, e.g.
//! `ctrl + c` or `ctrl + shift + t`. Plain typing is labelled by the produced symbol, and
//! shift is dropped from the label when all it did was pick the upper symbol of a key, so
//! `shift` + `a` counts as `A`, not as `shift + A`.

use std::{fmt::Display, sync::Arc};

/// Separator between the parts of a chord label.
pub const CHORD_SEPARATOR: &str = " + ";

/// Held-key sets at or above this size, with no modifier in them, are considered stuck.
pub const HELD_KEYS_GC_THRESHOLD: usize = 5;

/// Symbols a US layout produces with shift held. Used to tell whether shift only selected the
/// upper symbol of a key.
const SHIFTED_SYMBOLS: &str = "~!@#$%^&*()_+{}|:\"<>?";

/// AltGr level of the Turkish Q layout, keyed by the physical key's base character.
const ALTGR_SUBSTITUTIONS: &[(char, char)] = &[
    ('1', '>'),
    ('2', '£'),
    ('3', '#'),
    ('4', '$'),
    ('5', '½'),
    ('7', '{'),
    ('8', '['),
    ('9', ']'),
    ('0', '}'),
    ('*', '\\'),
    ('-', '|'),
    ('q', '@'),
    ('e', '€'),
    ('t', '₺'),
    ('ü', '~'),
    ('ş', '´'),
    ('i', '\''),
    (',', '`'),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
    AltGr,
    Cmd,
}

impl Modifier {
    pub fn name(&self) -> &'static str {
        match self {
            Modifier::Shift => "shift",
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::AltGr => "altgr",
            Modifier::Cmd => "cmd",
        }
    }
}

/// Which key of a left/right modifier pair. Modifiers with a single key use `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// Identity of a physical key, independent of what the layout produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Both keys of a pair are held independently, so releasing one keeps the other active.
    Modifier(Modifier, Side),
    /// A key that types a character, identified by its unshifted character.
    Char(char),
    /// Any other key, by lowercase name (`enter`, `f5`, `volumeup`, ...).
    Named(Arc<str>),
}

impl Key {
    pub fn named(name: &str) -> Self {
        Key::Named(name.to_lowercase().into())
    }

    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Modifier(..))
    }

    fn modifier(&self) -> Option<Modifier> {
        match self {
            Key::Modifier(m, _) => Some(*m),
            _ => None,
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Modifier(m, _) => write!(f, "{}", m.name()),
            Key::Char(' ') => write!(f, "space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Named(name) => write!(f, "{name}"),
        }
    }
}

pub fn is_shifted_symbol(symbol: char) -> bool {
    symbol.is_uppercase() || SHIFTED_SYMBOLS.contains(symbol)
}

pub fn altgr_substitute(base: char) -> Option<char> {
    ALTGR_SUBSTITUTIONS
        .iter()
        .find(|(from, _)| *from == base)
        .map(|(_, to)| *to)
}

fn printable(symbol: Option<char>) -> Option<char> {
    symbol.filter(|c| !c.is_control() && !c.is_whitespace())
}

/// Keys currently held down, in press order, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct HeldKeys {
    keys: Vec<Key>,
}

impl HeldKeys {
    /// Registers a press and returns the chord label it counts under.
    pub fn press(&mut self, key: Key, symbol: Option<char>) -> String {
        if !self.keys.contains(&key) {
            self.keys.push(key.clone());
        }
        if let Some(modifier) = key.modifier() {
            let mut modifiers = self.held_modifiers();
            modifiers.retain(|held| *held != modifier);
            return join_label(&modifiers, modifier.name());
        }
        self.label_for(&key, symbol)
    }

    /// Registers a release. A release of an untracked key while a large modifier-free set is
    /// held means presses and releases went out of sync, so the set is dropped.
    pub fn release(&mut self, key: &Key) {
        if let Some(index) = self.keys.iter().position(|held| held == key) {
            self.keys.remove(index);
            return;
        }
        if self.keys.len() >= HELD_KEYS_GC_THRESHOLD && !self.keys.iter().any(Key::is_modifier) {
            self.keys.clear();
        }
    }

    /// Held modifiers in press order. A pair held on both sides is listed once.
    fn held_modifiers(&self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        for modifier in self.keys.iter().filter_map(Key::modifier) {
            if !modifiers.contains(&modifier) {
                modifiers.push(modifier);
            }
        }
        modifiers
    }

    fn only_non_modifier_is(&self, key: &Key) -> bool {
        self.keys
            .iter()
            .filter(|held| !held.is_modifier())
            .all(|held| held == key)
    }

    fn label_for(&self, key: &Key, symbol: Option<char>) -> String {
        let mut modifiers = self.held_modifiers();

        if let (Some(index), Key::Char(base)) = (
            modifiers.iter().position(|m| *m == Modifier::AltGr),
            key,
        ) {
            if let Some(substituted) = altgr_substitute(*base) {
                modifiers.remove(index);
                return join_label(&modifiers, &substituted.to_string());
            }
        }

        let symbol = printable(symbol);
        match (modifiers.as_slice(), symbol) {
            ([], Some(symbol)) => symbol.to_string(),
            ([Modifier::Shift], Some(symbol))
                if is_shifted_symbol(symbol) && self.only_non_modifier_is(key) =>
            {
                symbol.to_string()
            }
            _ => join_label(&modifiers, &key.to_string()),
        }
    }
}

fn join_label(modifiers: &[Modifier], key: &str) -> String {
    modifiers
        .iter()
        .map(|m| -> &str { m.name() })
        .chain(std::iter::once(key))
        .collect::<Vec<_>>()
        .join(CHORD_SEPARATOR)
}

#[cfg(test)]
impl HeldKeys {
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn keys(&self) -> &[Key] {
        &self.keys
    }
}
