//! Engine tying searches to a host UI tree.

use std::sync::Arc;

use tracing::debug;

use crate::by::By;
use crate::element::UiElement;

/// A host UI tree the engine can search.
pub trait UiTree: Send + Sync {
    /// The element searches start from when no explicit root is given.
    fn root(&self) -> UiElement;
}

/// Runs searches against one UI tree.
#[derive(Clone)]
pub struct SearchEngine {
    tree: Arc<dyn UiTree>,
}

impl SearchEngine {
    pub fn new(tree: Arc<dyn UiTree>) -> Self {
        Self { tree }
    }

    /// First match of `by`, starting at `root` or the tree root. Stops
    /// walking the tree as soon as a match is found.
    pub fn find_first(&self, by: &By, root: Option<&UiElement>) -> Option<UiElement> {
        debug!("searching first match of '{}'", by);
        let start = self.start_element(root);
        by.part().find_elements(&start).next()
    }

    /// All matches of `by` as a lazy iterator.
    pub fn find_all<'a>(
        &self,
        by: &'a By,
        root: Option<&UiElement>,
    ) -> Box<dyn Iterator<Item = UiElement> + 'a> {
        debug!("searching all matches of '{}'", by);
        let start = self.start_element(root);
        by.part().find_elements(&start)
    }

    fn start_element(&self, root: Option<&UiElement>) -> UiElement {
        match root {
            Some(element) => element.clone(),
            None => self.tree.root(),
        }
    }
}
