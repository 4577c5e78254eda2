use std::collections::HashMap;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

/// A parsed element. `value` is the live control value, seeded from the
/// `value` attribute and mutated independently of it afterwards, the way
/// input controls behave.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
    pub(crate) disabled: bool,
    pub(crate) readonly: bool,
}

/// Arena-backed document tree. Detached subtrees stay in the arena but are
/// unreachable from the root, which is how removal is modeled.
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: NodeId, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            node_type,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let disabled = attrs.contains_key("disabled");
        let readonly = attrs.contains_key("readonly");
        let element = Element {
            tag_name,
            attrs,
            value,
            disabled,
            readonly,
        };
        let id = self.create_node(parent, NodeType::Element(element));
        if let Some(id_attr) = self
            .element(id)
            .and_then(|element| element.attrs.get("id").cloned())
        {
            self.id_index.insert(id_attr, id);
        }
        id
    }

    pub(crate) fn append_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(parent, NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|element| element.tag_name.as_str())
    }

    pub(crate) fn attr(&self, node_id: NodeId, key: &str) -> Option<String> {
        self.element(node_id)?.attrs.get(key).cloned()
    }

    pub(crate) fn has_class(&self, node_id: NodeId, class: &str) -> bool {
        self.element(node_id)
            .and_then(|element| element.attrs.get("class"))
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub(crate) fn disabled(&self, node_id: NodeId) -> bool {
        self.element(node_id)
            .map(|element| element.disabled)
            .unwrap_or(false)
    }

    pub(crate) fn readonly(&self, node_id: NodeId) -> bool {
        self.element(node_id)
            .map(|element| element.readonly)
            .unwrap_or(false)
    }

    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        self.element(node_id)
            .map(|element| element.value.clone())
            .ok_or_else(|| Error::Page("value target is not an element".into()))
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Page("value target is not an element".into()))?;
        element.value = value.to_string();
        Ok(())
    }

    pub(crate) fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let node = *self.id_index.get(id)?;
        self.is_attached(node).then_some(node)
    }

    pub(crate) fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(node) = cursor {
            if self
                .tag_name(node)
                .map(|t| t.eq_ignore_ascii_case(tag))
                .unwrap_or(false)
            {
                return Some(node);
            }
            cursor = self.parent(node);
        }
        None
    }

    pub(crate) fn is_attached(&self, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    /// Detaches `node_id` from its parent. The subtree stays in the arena
    /// but no longer appears in traversals from the root.
    pub(crate) fn remove_subtree(&mut self, node_id: NodeId) {
        let Some(parent) = self.parent(node_id) else {
            return;
        };
        self.nodes[parent.0].children.retain(|child| *child != node_id);
        self.nodes[node_id.0].parent = None;
    }

    /// All attached element nodes, in document order.
    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    /// Attached element nodes inside (not including) `scope`, in document
    /// order.
    pub(crate) fn element_nodes_within(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(scope, &mut out);
        out
    }

    fn collect_elements(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node_id.0].children {
            if self.element(*child).is_some() {
                out.push(*child);
            }
            self.collect_elements(*child, out);
        }
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node_id, &mut out);
        out
    }

    fn collect_text(&self, node_id: NodeId, out: &mut String) {
        if let NodeType::Text(text) = &self.nodes[node_id.0].node_type {
            out.push_str(text);
        }
        for child in &self.nodes[node_id.0].children {
            self.collect_text(*child, out);
        }
    }

    /// Single-line rendering of an element used in assertion messages.
    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let Some(element) = self.element(node_id) else {
            return "#document".into();
        };
        let mut out = format!("<{}", element.tag_name);
        let mut keys = element.attrs.keys().collect::<Vec<_>>();
        keys.sort();
        for key in keys {
            out.push_str(&format!(" {}=\"{}\"", key, element.attrs[key]));
        }
        if !element.value.is_empty() && !element.attrs.contains_key("value") {
            out.push_str(&format!(" value=\"{}\"", element.value));
        }
        out.push('>');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Dom {
        let mut dom = Dom::new();
        let form = dom.create_element(
            dom.root,
            "form".into(),
            HashMap::from([("action".into(), "/parking/1/checkin".into())]),
        );
        let input = dom.create_element(
            form,
            "input".into(),
            HashMap::from([
                ("name".into(), "licensePlate".into()),
                ("id".into(), "plate".into()),
            ]),
        );
        dom.append_text(input, String::new());
        dom
    }

    #[test]
    fn id_lookup_stops_resolving_after_removal() {
        let mut dom = fixture();
        let plate = dom.get_element_by_id("plate").expect("plate exists");
        let form = dom.parent(plate).expect("has parent");
        dom.remove_subtree(form);
        assert!(dom.get_element_by_id("plate").is_none());
        assert!(!dom.is_attached(plate));
    }

    #[test]
    fn ancestor_lookup_finds_owning_form() {
        let dom = fixture();
        let plate = dom.get_element_by_id("plate").expect("plate exists");
        let form = dom.find_ancestor_by_tag(plate, "form").expect("form owner");
        assert_eq!(dom.attr(form, "action").as_deref(), Some("/parking/1/checkin"));
    }

    #[test]
    fn value_tracks_mutations_not_the_attribute() {
        let mut dom = fixture();
        let plate = dom.get_element_by_id("plate").expect("plate exists");
        dom.set_value(plate, "ab123cd").expect("settable");
        assert_eq!(dom.value(plate).expect("readable"), "ab123cd");
        assert!(dom.attr(plate, "value").is_none());
    }
}
