//! Directory tree listing

use crate::session::{StorageError, StorageResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Directory,
    File,
}

/// One entry of a directory listing
///
/// Serializes as `{"name": ..., "type": "directory"|"file", "children": [...]}`;
/// files have no `children` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    fn file(name: String) -> Self {
        Self {
            name,
            node_type: NodeType::File,
            children: None,
        }
    }
}

/// Lists `root` recursively
///
/// Children are ordered directories first, then by name. Symbolic links are
/// listed as files and never followed.
pub fn list_tree(root: &Path) -> StorageResult<TreeNode> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let metadata = fs::symlink_metadata(root).map_err(|e| StorageError::io(root, e))?;
    if !metadata.is_dir() {
        return Ok(TreeNode::file(name));
    }

    let entries = fs::read_dir(root).map_err(|e| StorageError::io(root, e))?;
    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(root, e))?;
        children.push(list_tree(&entry.path())?);
    }

    children.sort_by(|a, b| {
        let rank = |node: &TreeNode| node.node_type != NodeType::Directory;
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });

    Ok(TreeNode {
        name,
        node_type: NodeType::Directory,
        children: Some(children),
    })
}
