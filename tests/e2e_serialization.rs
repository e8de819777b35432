//! End-to-end tests for the JSON document: serialize -> deserialize and
//! save -> load, checked through the public query API.

use std::time::Duration;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

use scene_graph_rs::{
    AttributeRegistry, BasicEdgeAttributes, BasicNodeAttributes, Error, LayerId, MeshBlob,
    NodeAttributes, NodeId, PlaceNodeAttributes, SceneGraph, SceneGraphConfig,
    SemanticNodeAttributes,
};

fn registry() -> AttributeRegistry {
    AttributeRegistry::with_defaults()
}

fn basic() -> Box<dyn NodeAttributes> {
    BasicNodeAttributes::default().boxed()
}

fn sym(category: char, index: u64) -> NodeId {
    NodeId::encode(category, index).unwrap()
}

fn round_trip(graph: &SceneGraph) -> SceneGraph {
    let text = graph.serialize().unwrap();
    SceneGraph::deserialize(&text, &registry()).unwrap()
}

fn three_layer_graph() -> SceneGraph {
    let mut graph = SceneGraph::new([1u64, 2, 3]);
    graph.emplace_node(1u64, 0u64, basic()).unwrap();
    graph.emplace_node(1u64, 1u64, basic()).unwrap();
    graph.emplace_node(3u64, 2u64, basic()).unwrap();
    graph.insert_edge(0u64, 1u64).unwrap();
    graph.insert_edge(1u64, 2u64).unwrap();
    graph
}

// ============================================================================
// 1. Static layers
// ============================================================================

#[test]
fn test_serialize_basic_graph() {
    let expected = three_layer_graph();
    let result = round_trip(&expected);

    assert_eq!(result.num_nodes(), 3);
    assert_eq!(result.num_edges(), 2);
    assert_eq!(result.num_layers(), 2);
    assert_eq!(result.num_layers(), expected.num_layers());
    assert_eq!(result.layer_ids(), expected.layer_ids());

    for id in 0..3u64 {
        assert!(result.has_node(NodeId(id)));
    }
    assert!(result.has_edge(NodeId(0), NodeId(1)));
    assert!(result.has_edge(NodeId(1), NodeId(2)));
    assert_eq!(result.has_layer(0u64), expected.has_layer(0u64));
    assert_eq!(result.interlayer_edges().count(), 1);
}

// ============================================================================
// 2. Non-finite values
// ============================================================================

#[test]
fn test_serialize_graph_with_nans() {
    let mut expected = three_layer_graph();
    expected
        .emplace_node(3u64, 3u64, BasicNodeAttributes::at([f64::NAN; 3]).boxed())
        .unwrap();
    expected.insert_edge(2u64, 3u64).unwrap();

    let text = expected.serialize().unwrap();
    assert!(text.contains(r#"["nan","nan","nan"]"#));

    let result = SceneGraph::deserialize(&text, &registry()).unwrap();
    assert_eq!(result.num_nodes(), 4);
    assert_eq!(result.num_edges(), 3);
    assert_eq!(result.num_layers(), expected.num_layers());
    assert!(result.has_edge(NodeId(2), NodeId(3)));

    let position = result.get_node(NodeId(3)).unwrap().attributes.position().unwrap();
    assert!(position.iter().all(|v| v.is_nan()));
}

#[test]
fn test_infinities_and_negative_nan_keep_their_sign() {
    let mut graph = SceneGraph::new([3u64]);
    let place = PlaceNodeAttributes::new([f64::INFINITY, f64::NEG_INFINITY, -f64::NAN], 0.25, 4);
    graph.emplace_node(3u64, sym('p', 0), Box::new(place)).unwrap();

    let result = round_trip(&graph);
    let restored = result.get_node(sym('p', 0)).unwrap().attributes_as::<PlaceNodeAttributes>().unwrap();
    assert_eq!(restored.position[0], f64::INFINITY);
    assert_eq!(restored.position[1], f64::NEG_INFINITY);
    assert!(restored.position[2].is_nan() && restored.position[2].is_sign_negative());
    assert_eq!(restored.distance, 0.25);
    assert_eq!(restored.num_basis_points, 4);
}

#[test]
fn test_finite_floats_round_trip_exactly() {
    let values = [
        21.305617633333334,
        0.1 + 0.2,
        1.0 / 3.0,
        f64::MIN_POSITIVE / 3.0,
        f64::MAX,
        -0.0,
        5e-324,
        -7.123456789012345e-120,
    ];
    let mut graph = SceneGraph::new([1u64]);
    for (index, value) in values.iter().enumerate() {
        let position = [*value, -value, value / 7.0];
        graph.emplace_node(1u64, index as u64, BasicNodeAttributes::at(position).boxed()).unwrap();
    }
    for index in 1..values.len() as u64 {
        let weight = values[index as usize] * 3.0;
        graph.insert_edge_with(index - 1, index, BasicEdgeAttributes::weighted(weight).boxed()).unwrap();
    }

    let result = round_trip(&graph);
    for (index, value) in values.iter().enumerate() {
        let expected = [*value, -value, value / 7.0].map(f64::to_bits);
        let position = result.get_node(NodeId(index as u64)).unwrap().attributes.position().unwrap();
        assert_eq!(position.map(f64::to_bits), expected);
    }
    for index in 1..values.len() as u64 {
        let edge = result.get_edge(NodeId(index - 1), NodeId(index)).unwrap();
        let weight = edge.info_as::<BasicEdgeAttributes>().unwrap().weight;
        assert_eq!(weight.to_bits(), (values[index as usize] * 3.0).to_bits());
    }
}

#[test]
fn test_nan_payload_bits_survive() {
    let quiet = f64::from_bits(0x7ff8_0000_0000_0001);
    let negative = f64::from_bits(0xfff8_0000_dead_beef);
    let mut graph = SceneGraph::new([1u64]);
    graph.emplace_node(1u64, 0u64, BasicNodeAttributes::at([quiet, negative, -f64::NAN]).boxed()).unwrap();

    let text = graph.serialize().unwrap();
    assert!(text.contains(r#""nan(0x8000000000001)""#));

    let result = SceneGraph::deserialize(&text, &registry()).unwrap();
    let position = result.get_node(NodeId(0)).unwrap().attributes.position().unwrap();
    assert_eq!(position.map(f64::to_bits), [quiet, negative, -f64::NAN].map(f64::to_bits));
}

#[test]
fn test_place_with_negative_distance_round_trips() {
    let mut graph = SceneGraph::new([3u64]);
    for (index, distance) in [-1.5, f64::NEG_INFINITY].into_iter().enumerate() {
        let place = PlaceNodeAttributes::new([0.0; 3], distance, 1);
        graph.emplace_node(3u64, sym('p', index as u64), Box::new(place)).unwrap();
    }

    let result = round_trip(&graph);
    let first = result.get_node(sym('p', 0)).unwrap().attributes_as::<PlaceNodeAttributes>().unwrap();
    let second = result.get_node(sym('p', 1)).unwrap().attributes_as::<PlaceNodeAttributes>().unwrap();
    assert_eq!(first.distance, -1.5);
    assert_eq!(second.distance, f64::NEG_INFINITY);
}

// ============================================================================
// 3. Dynamic layers
// ============================================================================

#[test]
fn test_serialize_dynamic_graph() {
    let mut expected = SceneGraph::default();
    expected.emplace_node(LayerId::PLACES, 0u64, basic()).unwrap();

    for (t, link) in [(10, true), (20, true), (30, false), (40, true)] {
        expected
            .emplace_dynamic_node(LayerId::AGENTS, 'a', Duration::from_nanos(t), basic(), link)
            .unwrap();
    }

    let result = round_trip(&expected);
    assert_eq!(result.num_nodes(), expected.num_nodes());
    assert_eq!(result.num_edges(), expected.num_edges());
    assert_eq!(result.num_layers(), expected.num_layers());
    assert_eq!(result.layer_ids(), expected.layer_ids());

    assert!(result.has_node(NodeId(0)));
    for index in 0..4 {
        assert!(result.has_node(sym('a', index)));
    }
    assert!(result.has_edge(sym('a', 0), sym('a', 1)));
    assert!(!result.has_edge(sym('a', 1), sym('a', 2)));
    assert!(result.has_edge(sym('a', 2), sym('a', 3)));
    assert!(result.has_dynamic_layer(LayerId::AGENTS, 'a'));

    let layer = result.get_dynamic_layer(LayerId::AGENTS, 'a').unwrap();
    assert_eq!(layer.last_timestamp(), Some(Duration::from_nanos(40)));
    assert_eq!(layer.next_node_id().unwrap(), sym('a', 4));
}

#[test]
fn test_deserialized_dynamic_layer_keeps_appending() {
    let mut graph = SceneGraph::default();
    for t in [10, 20] {
        graph.emplace_dynamic_node(2u64, 'a', Duration::from_nanos(t), basic(), true).unwrap();
    }

    let mut result = round_trip(&graph);
    let err = result
        .emplace_dynamic_node(2u64, 'a', Duration::from_nanos(20), basic(), true)
        .unwrap_err();
    assert!(matches!(err, Error::OutOfOrderTimestamp { .. }));

    let id = result
        .emplace_dynamic_node(2u64, 'a', Duration::from_nanos(30), basic(), true)
        .unwrap();
    assert_eq!(id, sym('a', 2));
    assert!(result.has_edge(sym('a', 1), sym('a', 2)));
}

// ============================================================================
// 4. Files
// ============================================================================

#[test]
fn test_save_and_load_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene_graph.json");

    let mut graph = SceneGraph::default();
    graph
        .emplace_node(LayerId::PLACES, sym('p', 0), BasicNodeAttributes::at([0.0; 3]).boxed())
        .unwrap();
    let mesh = json!({"vertices": [], "faces": []});
    graph.set_mesh(MeshBlob::new(mesh.clone()));

    graph.save(&path).unwrap();
    let other = SceneGraph::load(&path, &registry()).unwrap();

    assert_eq!(other.num_nodes(), graph.num_nodes());
    assert_eq!(other.num_layers(), graph.num_layers());
    assert_eq!(other.has_mesh(), graph.has_mesh());
    assert_eq!(other.mesh().unwrap().as_value(), &mesh);
}

#[test]
fn test_save_pretty_printed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pretty.json");

    let config = SceneGraphConfig::new([1u64]).with_pretty_print(true);
    let mut graph = SceneGraph::with_config(config);
    graph
        .emplace_node(1u64, 0u64, Box::new(SemanticNodeAttributes::new("lamp", [0.0, 1.0, 2.0])))
        .unwrap();
    graph.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains('\n'));
    assert!(!text.contains("\"mesh\""));

    let other = SceneGraph::load(&path, &registry()).unwrap();
    let node = other.get_node(NodeId(0)).unwrap();
    assert_eq!(node.attributes_as::<SemanticNodeAttributes>().unwrap().name, "lamp");
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SceneGraph::load(dir.path().join("missing.json"), &registry()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

// ============================================================================
// 5. Failures
// ============================================================================

#[test]
fn test_unknown_attribute_type_fails() {
    let mut text = three_layer_graph().serialize().unwrap();
    text = text.replacen("\"NodeAttributes\"", "\"RoomNodeAttributes\"", 1);

    let err = SceneGraph::deserialize(&text, &registry()).unwrap_err();
    assert!(matches!(err, Error::UnknownAttributeType(ref tag) if tag == "RoomNodeAttributes"));
}

#[test]
fn test_empty_registry_rejects_everything() {
    let text = three_layer_graph().serialize().unwrap();
    let err = SceneGraph::deserialize(&text, &AttributeRegistry::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownAttributeType(_)));
}

#[test]
fn test_custom_registration_round_trips() {
    let mut registry = AttributeRegistry::new();
    registry
        .nodes
        .register("NodeAttributes", || Box::new(PlaceNodeAttributes::default()) as Box<dyn NodeAttributes>);
    registry.edges.register_type::<BasicEdgeAttributes>();

    let text = json!({
        "layer_ids": [3],
        "nodes": [{"id": 0, "layer": 3, "attributes": {
            "type": "NodeAttributes", "position": [1, 2, 3], "distance": 0.5, "num_basis_points": 1
        }}],
    })
    .to_string();

    let graph = SceneGraph::deserialize(&text, &registry).unwrap();
    assert!(graph.get_node(NodeId(0)).unwrap().attributes.is::<PlaceNodeAttributes>());
}

// ============================================================================
// 6. Arbitrary graphs
// ============================================================================

fn bits(position: [f64; 3]) -> [u64; 3] {
    position.map(f64::to_bits)
}

fn finite() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite", |v| v.is_finite())
}

proptest! {
    #[test]
    fn prop_finite_positions_round_trip_bit_exact(
        positions in proptest::collection::vec(proptest::array::uniform3(finite()), 1..64),
    ) {
        let mut graph = SceneGraph::new([1u64]);
        for (index, position) in positions.iter().enumerate() {
            graph.emplace_node(1u64, index as u64, BasicNodeAttributes::at(*position).boxed()).unwrap();
        }

        let result = round_trip(&graph);
        for (index, position) in positions.iter().enumerate() {
            let restored = result.get_node(NodeId(index as u64)).unwrap().attributes.position().unwrap();
            prop_assert_eq!(bits(restored), bits(*position));
        }
    }

    #[test]
    fn prop_round_trip_preserves_graph(
        layers in proptest::collection::btree_set(1u64..6, 1..4),
        positions in proptest::collection::vec(proptest::array::uniform3(any::<f64>()), 1..16),
        placement in proptest::collection::vec(any::<usize>(), 16),
        arrivals in proptest::collection::vec(
            (0usize..2, 1u64..1_000, any::<bool>(), proptest::array::uniform3(any::<f64>())),
            0..12,
        ),
        removals in proptest::collection::vec(any::<usize>(), 0..4),
        edges in proptest::collection::vec(
            (any::<usize>(), any::<usize>(), proptest::option::of(any::<f64>())),
            0..40,
        ),
    ) {
        let layers: Vec<u64> = layers.into_iter().collect();
        let mut graph = SceneGraph::new(layers.iter().copied());
        let mut ids = Vec::new();

        for (index, (position, slot)) in positions.iter().zip(&placement).enumerate() {
            let layer = layers[slot % layers.len()];
            graph.emplace_node(layer, index as u64, BasicNodeAttributes::at(*position).boxed()).unwrap();
            ids.push(NodeId(index as u64));
        }

        // Agents share a layer id with static nodes, so their edges to
        // those nodes are inter-layer.
        let agent_layer = layers[0];
        let mut clocks = [0u64; 2];
        let mut trajectory = Vec::new();
        for (agent, step, link, position) in arrivals {
            clocks[agent] += step;
            let id = graph
                .emplace_dynamic_node(
                    agent_layer,
                    ['a', 'b'][agent],
                    Duration::from_nanos(clocks[agent]),
                    BasicNodeAttributes::at(position).boxed(),
                    link,
                )
                .unwrap();
            trajectory.push(id);
        }
        for pick in removals {
            if !trajectory.is_empty() {
                let _ = graph.remove_node(trajectory[pick % trajectory.len()]);
            }
        }
        ids.extend(trajectory);

        for (a, b, weight) in edges {
            let (a, b) = (ids[a % ids.len()], ids[b % ids.len()]);
            let info = weight.map_or_else(BasicEdgeAttributes::default, BasicEdgeAttributes::weighted);
            // Self-loops, repeats and removed endpoints are rejected; the graph is unchanged.
            let _ = graph.insert_edge_with(a, b, info.boxed());
        }

        let result = round_trip(&graph);
        prop_assert_eq!(result.num_nodes(), graph.num_nodes());
        prop_assert_eq!(result.num_edges(), graph.num_edges());
        prop_assert_eq!(result.num_layers(), graph.num_layers());
        prop_assert_eq!(result.layer_ids(), graph.layer_ids());

        for &a in &ids {
            prop_assert_eq!(result.has_node(a), graph.has_node(a));
            prop_assert_eq!(result.node_layer(a), graph.node_layer(a));
            if let Some(node) = graph.get_node(a) {
                let restored = result.get_node(a).unwrap();
                prop_assert_eq!(restored.timestamp, node.timestamp);
                prop_assert_eq!(
                    bits(restored.attributes.position().unwrap()),
                    bits(node.attributes.position().unwrap())
                );
            }
            for &b in &ids {
                match (graph.get_edge(a, b), result.get_edge(a, b)) {
                    (None, None) => {}
                    (Some(expected), Some(actual)) => {
                        let expected = expected.info_as::<BasicEdgeAttributes>().unwrap();
                        let actual = actual.info_as::<BasicEdgeAttributes>().unwrap();
                        prop_assert_eq!(actual.weighted, expected.weighted);
                        prop_assert_eq!(actual.weight.to_bits(), expected.weight.to_bits());
                    }
                    (expected, actual) => {
                        prop_assert!(
                            false,
                            "edge {} -> {}: present before {}, after {}",
                            a,
                            b,
                            expected.is_some(),
                            actual.is_some()
                        );
                    }
                }
            }
        }

        prop_assert_eq!(result.dynamic_layers().count(), graph.dynamic_layers().count());
        for layer in graph.dynamic_layers() {
            let restored = result.get_dynamic_layer(layer.id(), layer.prefix()).unwrap();
            prop_assert_eq!(restored.next_node_id().unwrap(), layer.next_node_id().unwrap());
            prop_assert_eq!(restored.last_timestamp(), layer.last_timestamp());
        }
        prop_assert_eq!(result.to_document().unwrap(), graph.to_document().unwrap());
    }
}
