//! In-place edits of a paged item list.

use std::fmt;
use std::sync::Arc;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// One edit applied to the current items.
pub enum ItemsEdit<T> {
    /// Insert `items` before `position`. Positions past the end append.
    Add { position: usize, items: Vec<T> },
    /// Drop every item matching the predicate.
    Remove(Predicate<T>),
}

impl<T> ItemsEdit<T> {
    pub fn add(position: usize, items: Vec<T>) -> Self {
        ItemsEdit::Add { position, items }
    }

    pub fn remove(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        ItemsEdit::Remove(Arc::new(predicate))
    }

    fn apply(self, mut current: Vec<T>) -> Vec<T> {
        match self {
            ItemsEdit::Add { position, items } => {
                let position = position.min(current.len());
                current.splice(position..position, items);
                current
            }
            ItemsEdit::Remove(predicate) => {
                current.retain(|item| !(*predicate)(item));
                current
            }
        }
    }
}

impl<T: Clone> Clone for ItemsEdit<T> {
    fn clone(&self) -> Self {
        match self {
            ItemsEdit::Add { position, items } => ItemsEdit::Add {
                position: *position,
                items: items.clone(),
            },
            ItemsEdit::Remove(predicate) => ItemsEdit::Remove(Arc::clone(predicate)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ItemsEdit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemsEdit::Add { position, items } => f
                .debug_struct("Add")
                .field("position", position)
                .field("items", items)
                .finish(),
            ItemsEdit::Remove(_) => f.write_str("Remove(..)"),
        }
    }
}

/// Apply `edits` left to right.
pub(crate) fn apply_edits<T>(items: Vec<T>, edits: Vec<ItemsEdit<T>>) -> Vec<T> {
    edits.into_iter().fold(items, |items, edit| edit.apply(items))
}
