//! Hierarchy tree rebuilt from an indentation-coded power report.
//!
//! Every report line owns a mapping keyed by its instance name; the record for
//! that line sits inside its own mapping under the same name, next to the
//! mappings of its children. Children keep report order.

use crate::report::{Dialect, PowerRecord};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Interior(Children),
    Leaf(PowerRecord),
}

pub type Children = IndexMap<String, Node>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("segment {segment:?} of the path is a power record, not a hierarchy level")]
    DescendThroughLeaf { segment: String },

    #[error("{key:?} already holds child hierarchy and cannot take a power record")]
    LeafOverInterior { key: String },

    #[error("{key:?} already has a power record")]
    DuplicateLeaf { key: String },

    #[error("empty hierarchy path")]
    EmptyPath,
}

/// Parsed report: independent top-level instances plus the latched dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyTree {
    pub dialect: Dialect,
    pub roots: Children,
}

impl HierarchyTree {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            roots: Children::new(),
        }
    }

    /// Walk (creating as needed) one mapping per `path` segment, then store
    /// `record` under its own instance name in the innermost mapping.
    pub fn insert(&mut self, path: &[String], record: PowerRecord) -> Result<(), InsertError> {
        if path.is_empty() {
            return Err(InsertError::EmptyPath);
        }

        let mut level = &mut self.roots;
        for segment in path {
            let node = level
                .entry(segment.clone())
                .or_insert_with(|| Node::Interior(Children::new()));
            level = match node {
                Node::Interior(children) => children,
                Node::Leaf(_) => {
                    return Err(InsertError::DescendThroughLeaf {
                        segment: segment.clone(),
                    });
                }
            };
        }

        match level.get(&record.instance_name) {
            Some(Node::Interior(_)) => Err(InsertError::LeafOverInterior {
                key: record.instance_name,
            }),
            Some(Node::Leaf(_)) => Err(InsertError::DuplicateLeaf {
                key: record.instance_name,
            }),
            None => {
                level.insert(record.instance_name.clone(), Node::Leaf(record));
                Ok(())
            }
        }
    }

    /// Look up the record stored for a hierarchy path such as `["top", "u_core"]`.
    #[cfg(test)]
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&PowerRecord> {
        let (last, _) = path.split_last()?;
        let mut level = &self.roots;
        for segment in path {
            match level.get(segment.as_ref())? {
                Node::Interior(children) => level = children,
                Node::Leaf(_) => return None,
            }
        }
        match level.get(last.as_ref())? {
            Node::Leaf(rec) => Some(rec),
            Node::Interior(_) => None,
        }
    }

    pub fn root_names(&self) -> Vec<String> {
        self.roots.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves().next().is_none()
    }

    /// Depth-first pre-order walk yielding each record with its mapping path.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![self.roots.iter()],
            path: Vec::new(),
        }
    }
}

/// Iterator behind [`HierarchyTree::leaves`].
pub struct Leaves<'a> {
    stack: Vec<indexmap::map::Iter<'a, String, Node>>,
    path: Vec<&'a str>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (Vec<&'a str>, &'a PowerRecord);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some((_, Node::Leaf(rec))) => return Some((self.path.clone(), rec)),
                Some((key, Node::Interior(children))) => {
                    self.path.push(key.as_str());
                    self.stack.push(children.iter());
                }
                None => {
                    self.stack.pop();
                    self.path.pop();
                }
            }
        }
    }
}
