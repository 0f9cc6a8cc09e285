//! Table-driven parse-rejection cases (§4.A: "The parser rejects: unknown node
//! kinds; children of a kind that forbids them; missing required fields on Action
//! nodes").

use botswarm::{TreeMode, parse};
use rstest::rstest;

#[rstest]
#[case::unknown_kind("<Root><Bogus/></Root>")]
#[case::condition_with_children(r#"<Root><Condition script="true"><Wait duration_ms="1"/></Condition></Root>"#)]
#[case::assert_with_children(r#"<Root><Assert script="true"><Wait duration_ms="1"/></Assert></Root>"#)]
#[case::wait_with_children("<Root><Wait duration_ms=\"1\"><Wait duration_ms=\"1\"/></Wait></Root>")]
#[case::action_with_children(r#"<Root><Action method="\"GET\"" url="\"http://x\""><Wait duration_ms="1"/></Action></Root>"#)]
#[case::action_missing_method(r#"<Root><Action url="\"http://x\""/></Root>"#)]
#[case::action_missing_url(r#"<Root><Action method="\"GET\""/></Root>"#)]
#[case::root_with_no_children("<Root/>")]
#[case::root_with_two_children("<Root><Wait duration_ms=\"1\"/><Wait duration_ms=\"1\"/></Root>")]
#[case::loop_with_no_children("<Root><Loop count=\"3\"/></Root>")]
#[case::document_element_not_root("<Sequence><Wait duration_ms=\"1\"/></Sequence>")]
fn rejects_structurally_invalid_trees(#[case] xml: &str) {
    let err = parse("bad", xml, TreeMode::Thread).expect_err("structurally invalid tree must be rejected");
    assert!(matches!(err, botswarm::tree::Error::InvalidTree(_)));
}

#[rstest]
#[case::sequence(r#"<Root><Sequence><Wait duration_ms="1"/></Sequence></Root>"#)]
#[case::selector(r#"<Root><Selector><Wait duration_ms="1"/></Selector></Root>"#)]
#[case::parallel(r#"<Root><Parallel><Wait duration_ms="1"/><Wait duration_ms="1"/></Parallel></Root>"#)]
#[case::loop_node(r#"<Root><Loop count="2"><Wait duration_ms="1"/></Loop></Root>"#)]
#[case::action_with_headers(
    r#"<Root><Action method="\"GET\"" url="\"http://x\""><Header name="X" value="\"1\""/></Action></Root>"#
)]
fn accepts_structurally_valid_trees(#[case] xml: &str) {
    parse("good", xml, TreeMode::Thread).expect("structurally valid tree must parse");
}

#[test]
fn reparsing_an_accepted_blob_is_structurally_identical() {
    let xml = r#"<Root><Sequence><Action method="\"GET\"" url="\"http://x\""/><Assert script="meta.v == 1"/></Sequence></Root>"#;
    let a = parse("t", xml, TreeMode::Thread).expect("first parse");
    let b = parse("t", xml, TreeMode::Thread).expect("second parse");

    assert_eq!(a.len(), b.len());
    for id in 0..a.len() as botswarm::NodeId {
        let node_a = a.node(id).expect("node present in a");
        let node_b = b.node(id).expect("node present in b");
        assert_eq!(node_a.kind(), node_b.kind());
        assert_eq!(node_a.children(), node_b.children());
    }
}
