// Copyright © 2025 Stephan Kunz

//! XML parser for the Tree Model.
//!
//! The wire format is XML, matching the teacher's Tree Model component directly, but
//! the node registry here is closed: the nine kinds in [`NodeKind`] are matched by tag
//! name, there are no ports, remappings, subtrees or includes.

use std::collections::HashMap;

use roxmltree::{Document, Node as XmlNode, NodeType};
use tracing::{Level, event, instrument};

use crate::ConstString;

use super::error::Error;
use super::model::{ActionDescriptor, NodeBuilder, NodeId, NodeKind, Tree, TreeMode};

struct Parser {
    next_id: NodeId,
    nodes: HashMap<NodeId, super::model::Node>,
}

/// Parses a serialized behavior tree into an immutable [`Tree`].
///
/// Rejects unknown node kinds, children on a kind that forbids them, and missing
/// required fields on `Action` nodes, returning [`Error::InvalidTree`].
#[instrument(level = Level::DEBUG, skip_all)]
pub fn parse(name: &str, xml: &str, mode: TreeMode) -> Result<Tree, Error> {
    let doc = Document::parse(xml)?;
    let root_elem = doc
        .root()
        .children()
        .find(|n| n.node_type() == NodeType::Element)
        .ok_or_else(|| Error::InvalidTree("empty document".into()))?;

    let mut parser = Parser {
        next_id: 0,
        nodes: HashMap::new(),
    };
    let root_id = parser.build_node(&root_elem)?;
    if parser.nodes.get(&root_id).map(super::model::Node::kind) != Some(NodeKind::Root) {
        return Err(Error::InvalidTree("document element must be <Root>".into()));
    }
    event!(Level::DEBUG, nodes = parser.nodes.len(), "parsed tree {name}");
    Ok(Tree::new(name.into(), mode, root_id, parser.nodes))
}

impl Parser {
    fn alloc_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn build_node(&mut self, elem: &XmlNode) -> Result<NodeId, Error> {
        let kind = kind_of(elem.tag_name().name())
            .ok_or_else(|| Error::InvalidTree(format!("unknown node kind <{}>", elem.tag_name().name()).into()))?;

        let id = self.alloc_id();
        let script = elem.attribute("script").map(ConstString::from);

        let all_child_elems: Vec<XmlNode> = elem
            .children()
            .filter(|n| n.node_type() == NodeType::Element)
            .collect();

        // An `Action`'s only permitted children are `<Header>` descriptor entries,
        // which `build_action_descriptor` consumes directly — they are not tree
        // nodes and never enter `children`. Every other kind's children are ordinary
        // tree children, subject to the generic `allows_children` rule.
        let child_elems: Vec<XmlNode> = if kind == NodeKind::Action {
            for child in &all_child_elems {
                if child.tag_name().name() != "Header" {
                    return Err(Error::InvalidTree(
                        format!("<Action> does not accept <{}> children", child.tag_name().name()).into(),
                    ));
                }
            }
            Vec::new()
        } else {
            all_child_elems
        };

        if !kind.allows_children() && !child_elems.is_empty() {
            return Err(Error::InvalidTree(
                format!("<{}> does not accept children", elem.tag_name().name()).into(),
            ));
        }
        if kind == NodeKind::Root && child_elems.len() != 1 {
            return Err(Error::InvalidTree("<Root> must have exactly one child".into()));
        }
        if kind == NodeKind::Loop && child_elems.len() != 1 {
            return Err(Error::InvalidTree("<Loop> must have exactly one child".into()));
        }

        let action = if kind == NodeKind::Action {
            Some(self.build_action_descriptor(elem)?)
        } else {
            None
        };

        let loop_count = if kind == NodeKind::Loop {
            parse_attr(elem, "count", 0)?
        } else {
            0
        };
        let wait_ms = if kind == NodeKind::Wait {
            parse_attr(elem, "duration_ms", 0)?
        } else {
            0
        };

        let mut children = Vec::with_capacity(child_elems.len());
        for child in &child_elems {
            children.push(self.build_node(child)?);
        }

        let node = NodeBuilder {
            id,
            kind,
            children,
            script,
            action,
            loop_count,
            wait_ms,
        }
        .build();
        self.nodes.insert(id, node);
        Ok(id)
    }

    fn build_action_descriptor(&self, elem: &XmlNode) -> Result<ActionDescriptor, Error> {
        let method = elem
            .attribute("method")
            .ok_or_else(|| Error::InvalidTree("<Action> missing required attribute `method`".into()))?;
        let url = elem
            .attribute("url")
            .ok_or_else(|| Error::InvalidTree("<Action> missing required attribute `url`".into()))?;
        let body = elem.attribute("body").unwrap_or_default();
        let timeout_ms = parse_attr(elem, "timeout_ms", 0)?;

        let mut headers = Vec::new();
        for child in elem
            .children()
            .filter(|n| n.node_type() == NodeType::Element && n.tag_name().name() == "Header")
        {
            let name = child
                .attribute("name")
                .ok_or_else(|| Error::InvalidTree("<Header> missing `name`".into()))?;
            let value = child
                .attribute("value")
                .ok_or_else(|| Error::InvalidTree("<Header> missing `value`".into()))?;
            headers.push((ConstString::from(name), ConstString::from(value)));
        }

        Ok(ActionDescriptor {
            method: method.into(),
            url: url.into(),
            headers,
            body: body.into(),
            timeout_ms,
        })
    }
}

fn kind_of(tag: &str) -> Option<NodeKind> {
    Some(match tag {
        "Root" => NodeKind::Root,
        "Sequence" => NodeKind::Sequence,
        "Selector" => NodeKind::Selector,
        "Parallel" => NodeKind::Parallel,
        "Loop" => NodeKind::Loop,
        "Condition" => NodeKind::Condition,
        "Action" => NodeKind::Action,
        "Assert" => NodeKind::Assert,
        "Wait" => NodeKind::Wait,
        _ => return None,
    })
}

fn parse_attr<T>(elem: &XmlNode, name: &str, default: T) -> Result<T, Error>
where
    T: std::str::FromStr,
{
    match elem.attribute(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::InvalidTree(format!("attribute `{name}` is not a valid number").into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_sequence() {
        let xml = r#"
            <Root>
                <Sequence>
                    <Action method="\"GET\"" url="\"http://mock/ok\"" timeout_ms="1000" script="meta.v = response.body.v"/>
                    <Assert script="meta.v == 1"/>
                </Sequence>
            </Root>
        "#;
        let tree = parse("t1", xml, TreeMode::Thread).expect("valid tree");
        assert_eq!(tree.len(), 4);
        let root = tree.node(tree.root()).expect("root");
        assert_eq!(root.kind(), NodeKind::Root);
        let seq = tree.node(tree.children(tree.root())[0]).expect("sequence");
        assert_eq!(seq.kind(), NodeKind::Sequence);
        assert_eq!(seq.children().len(), 2);
    }

    #[test]
    fn rejects_unknown_kind() {
        let xml = "<Root><Bogus/></Root>";
        let err = parse("bad", xml, TreeMode::Thread).unwrap_err();
        assert!(matches!(err, Error::InvalidTree(_)));
    }

    #[test]
    fn rejects_children_on_condition() {
        let xml = r#"<Root><Condition script="true"><Wait duration_ms="10"/></Condition></Root>"#;
        let err = parse("bad", xml, TreeMode::Thread).unwrap_err();
        assert!(matches!(err, Error::InvalidTree(_)));
    }

    #[test]
    fn rejects_action_missing_url() {
        let xml = r#"<Root><Action method="\"GET\""/></Root>"#;
        let err = parse("bad", xml, TreeMode::Thread).unwrap_err();
        assert!(matches!(err, Error::InvalidTree(_)));
    }

    #[test]
    fn action_headers_are_consumed_into_descriptor_not_tree_children() {
        let xml = r#"
            <Root>
                <Action method="\"GET\"" url="\"http://mock/ok\"">
                    <Header name="X-Trace" value="\"abc\""/>
                    <Header name="X-Bot" value="meta.id"/>
                </Action>
            </Root>
        "#;
        let tree = parse("t", xml, TreeMode::Thread).expect("action with headers must parse");
        let action_id = tree.children(tree.root())[0];
        let action = tree.node(action_id).expect("action node");
        assert!(action.children().is_empty(), "Header children are not tree children");
        let descriptor = action.action().expect("action descriptor");
        assert_eq!(descriptor.headers.len(), 2);
        assert_eq!(&*descriptor.headers[0].0, "X-Trace");
    }

    #[test]
    fn rejects_action_with_non_header_child() {
        let xml = r#"<Root><Action method="\"GET\"" url="\"http://mock/ok\""><Wait duration_ms="1"/></Action></Root>"#;
        let err = parse("bad", xml, TreeMode::Thread).unwrap_err();
        assert!(matches!(err, Error::InvalidTree(_)));
    }

    #[test]
    fn round_trip_is_structurally_identical() {
        let xml = r#"<Root><Sequence><Wait duration_ms="5"/></Sequence></Root>"#;
        let a = parse("t", xml, TreeMode::Thread).expect("first parse");
        let b = parse("t", xml, TreeMode::Thread).expect("second parse");
        assert_eq!(a.len(), b.len());
        assert_eq!(a.node(a.root()).unwrap().kind(), b.node(b.root()).unwrap().kind());
    }
}
