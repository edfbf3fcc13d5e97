use std::io::{BufRead, Write};

use log::{debug, warn};

use crate::TreeIoError;
use super::{ImageTree, NodeId};

/// Child ordinals of an id string, root first. `None` if malformed.
fn parse_path(text: &str) -> Option<Vec<usize>> {
    let mut parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.pop()? != "0" {
        return None;
    }
    parts
        .into_iter()
        .map(|part| part.parse::<usize>().ok().filter(|&ordinal| ordinal > 0))
        .collect()
}

impl ImageTree {
    /// The position of `id` as the 1-based child ordinals taken from the root,
    /// each followed by a comma, and a final `0`. The root is `"0"`.
    /// Empty if `id` has been deleted.
    pub fn id_string(&self, id: NodeId) -> String {
        if !self.contains(id) {
            return String::new();
        }
        let mut ordinals = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.arena.node(cur).parent {
            let children = &self.arena.node(parent).children;
            if let Some(i) = children.iter().position(|&c| c == cur) {
                ordinals.push(i + 1);
            }
            cur = parent;
        }
        let mut text = String::new();
        for ordinal in ordinals.iter().rev() {
            text.push_str(&ordinal.to_string());
            text.push(',');
        }
        text.push('0');
        text
    }

    /// Resolves an id string produced by `id_string`.
    pub fn node_from_id_string(&self, text: &str) -> Option<NodeId> {
        let path = parse_path(text)?;
        let mut cur = self.root();
        for ordinal in path {
            cur = *self.arena.node(cur).children.get(ordinal - 1)?;
        }
        Some(cur)
    }

    /// Writes the id string of each of `nodes`, one per line.
    pub fn write_node_ids(&self, nodes: &[NodeId], mut out: impl Write) -> Result<(), TreeIoError> {
        for &id in nodes {
            writeln!(out, "{}", self.id_string(id))?;
        }
        Ok(())
    }

    /// Reads a selection written by `write_node_ids`. Blank lines are skipped;
    /// ids that do not resolve in this tree are skipped with a warning.
    pub fn load_nodes_from_id_file(&self, input: impl BufRead) -> Result<Vec<NodeId>, TreeIoError> {
        let mut nodes = Vec::new();
        for (i, line) in input.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if parse_path(text).is_none() {
                return Err(TreeIoError::MalformedId {
                    line: i + 1,
                    text: text.to_owned(),
                });
            }
            match self.node_from_id_string(text) {
                Some(id) => nodes.push(id),
                None => warn!("line {}: {} is not a node of this tree", i + 1, text),
            }
        }
        debug!("loaded {} nodes", nodes.len());
        Ok(nodes)
    }
}
