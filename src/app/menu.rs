use std::collections::BTreeSet;

use crate::toolchain::ToolchainId;

pub struct MenuItem {
    pub id: ToolchainId,
    pub name: &'static str,
}

/// The toolchain picker. Selection is returned in menu order, whatever the
/// order the items were toggled in.
pub struct Menu {
    items: Vec<MenuItem>,
    cursor: usize,
    selected: BTreeSet<usize>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self {
            items,
            cursor: 0,
            selected: BTreeSet::new(),
        }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.cursor + 1 < self.items.len() {
            self.cursor += 1;
        }
    }

    pub fn toggle(&mut self) {
        if self.cursor >= self.items.len() {
            return;
        }
        if !self.selected.remove(&self.cursor) {
            self.selected.insert(self.cursor);
        }
    }

    pub fn selection(&self) -> Vec<ToolchainId> {
        self.selected
            .iter()
            .filter_map(|index| self.items.get(*index))
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn name_of(&self, id: &ToolchainId) -> String {
        self.items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| item.name.to_string())
            .unwrap_or_else(|| id.to_string())
    }
}
