//! Mnemonics: single keys that, together with a modifier, activate a widget.

use std::collections::BTreeMap;

use toplevel_core::state::ModifierType;
use tracing::warn;

/// Identifies a widget inside a window's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

/// The mnemonics of a window, keyed by keyval.
///
/// Several widgets may share a keyval; they are kept in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnemonicTable {
    entries: BTreeMap<u32, Vec<WidgetId>>,
    modifier: ModifierType,
}

impl Default for MnemonicTable {
    fn default() -> Self {
        MnemonicTable { entries: BTreeMap::new(), modifier: ModifierType::MOD1 }
    }
}

impl MnemonicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `target` already has this mnemonic.
    pub fn add(&mut self, keyval: u32, target: WidgetId) -> bool {
        let targets = self.entries.entry(keyval).or_default();
        if targets.contains(&target) {
            warn!(keyval, ?target, "mnemonic added twice");
            return false;
        }

        targets.push(target);
        true
    }

    /// Returns whether the mnemonic existed.
    pub fn remove(&mut self, keyval: u32, target: WidgetId) -> bool {
        let Some(targets) = self.entries.get_mut(&keyval) else {
            return false;
        };

        let Some(index) = targets.iter().position(|&existing| existing == target) else {
            return false;
        };

        targets.remove(index);
        if targets.is_empty() {
            self.entries.remove(&keyval);
        }
        true
    }

    pub fn targets(&self, keyval: u32) -> &[WidgetId] {
        self.entries.get(&keyval).map_or(&[], Vec::as_slice)
    }

    pub fn modifier(&self) -> ModifierType {
        self.modifier
    }

    pub fn set_modifier(&mut self, modifier: ModifierType) -> bool {
        let changed = self.modifier != modifier;
        self.modifier = modifier;
        changed
    }

    /// All keyvals with at least one mnemonic, in ascending order.
    pub fn keyvals(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_F: u32 = 0x66;
    const KEY_O: u32 = 0x6f;

    #[test]
    fn targets_keep_insertion_order() {
        let mut table = MnemonicTable::new();
        assert!(table.add(KEY_F, WidgetId(2)));
        assert!(table.add(KEY_F, WidgetId(1)));
        assert!(!table.add(KEY_F, WidgetId(2)));
        assert!(table.add(KEY_O, WidgetId(3)));

        assert_eq!(table.targets(KEY_F), &[WidgetId(2), WidgetId(1)]);
        assert_eq!(table.keyvals().collect::<Vec<_>>(), vec![KEY_F, KEY_O]);
    }

    #[test]
    fn removing_the_last_target_drops_the_key() {
        let mut table = MnemonicTable::new();
        table.add(KEY_O, WidgetId(3));

        assert!(!table.remove(KEY_O, WidgetId(4)));
        assert!(table.remove(KEY_O, WidgetId(3)));
        assert!(table.targets(KEY_O).is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn alt_is_the_default_modifier() {
        let mut table = MnemonicTable::new();
        assert_eq!(table.modifier(), ModifierType::MOD1);
        assert!(!table.set_modifier(ModifierType::MOD1));
        assert!(table.set_modifier(ModifierType::CONTROL));
    }
}
