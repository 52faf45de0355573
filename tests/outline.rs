use poslist::{testing::MockOrder, Error, IndexSearch, NodeId, Outline};

mod common;
use common::pos;

#[test]
fn tracking_presence_without_values() {
    let mut order = MockOrder::new();
    let root = NodeId::root();
    let node = order.add_node("B1", &root, 1, 6);
    let mut outline = Outline::new();

    outline.add(&order, &pos(&root, 0)).unwrap();
    outline.add(&order, &pos(&root, 1)).unwrap();
    outline.add_run(&order, &pos(&node, 2), 3).unwrap();

    assert_eq!(outline.len(), 5);
    assert!(outline.has(&order, &pos(&node, 3)).unwrap());
    assert!(!outline.has(&order, &pos(&node, 0)).unwrap());

    // node B1 is anchored before root slot 1
    let positions = outline
        .positions(&order, ..)
        .unwrap()
        .collect::<poslist::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(positions, vec![
        pos(&root, 0),
        pos(&node, 2),
        pos(&node, 3),
        pos(&node, 4),
        pos(&root, 1),
    ]);

    for (index, position) in positions.iter().enumerate() {
        assert_eq!(outline.position_at(&order, index).unwrap(), *position);
        assert_eq!(
            outline.index_of_position(&order, position, IndexSearch::Exact).unwrap(),
            Some(index),
        );
    }
}

#[test]
fn deleting_runs() {
    let mut order = MockOrder::new();
    let root = NodeId::root();
    let node = order.add_node("B1", &root, 0, 8);
    let mut outline = Outline::new();
    outline.add_run(&order, &pos(&node, 0), 8).unwrap();

    outline.delete_run(&order, &pos(&node, 2), 4).unwrap();

    assert_eq!(outline.len(), 4);
    assert_eq!(
        outline.index_of_position(&order, &pos(&node, 6), IndexSearch::Exact).unwrap(),
        Some(2),
    );
    assert_eq!(
        outline.index_of_position(&order, &pos(&node, 3), IndexSearch::Right).unwrap(),
        Some(2),
    );

    // deleting what is already absent changes nothing
    outline.delete(&order, &pos(&node, 2)).unwrap();
    assert_eq!(outline.len(), 4);
}

#[test]
fn inserting_fresh_positions() {
    let mut order = MockOrder::new();
    let mut outline = Outline::new();

    let (start, created) = outline.insert_at(&mut order, 0, 3).unwrap();
    assert!(created.is_some());
    assert_eq!(outline.len(), 3);

    // the three positions are consecutive slots of the created node
    for k in 0..3 {
        assert_eq!(
            outline.position_at(&order, k).unwrap(),
            pos(&start.node, start.slot + k),
        );
    }

    assert!(matches!(
        outline.insert_at(&mut order, 0, 0),
        Err(Error::InvalidInsertion { .. }),
    ));
}

#[test]
fn the_saved_state_alternates_run_lengths() {
    let mut order = MockOrder::new();
    let root = NodeId::root();
    let node = order.add_node("B1", &root, 0, 8);
    let mut outline = Outline::new();

    outline.add(&order, &pos(&root, 0)).unwrap();
    // B1 holds slots 2 and 5-6: absent 2, present 1, absent 2, present 2
    outline.add(&order, &pos(&node, 2)).unwrap();
    outline.add_run(&order, &pos(&node, 5), 2).unwrap();

    // the encoding starts with a present length, zero when the node's first
    // slots are absent
    assert_eq!(
        serde_json::to_value(outline.save()).unwrap(),
        serde_json::json!({
            "B1": [0, 2, 1, 2, 2],
            "ROOT": [1],
        }),
    );
}

#[test]
fn saving_and_loading_round_trips() {
    let mut order = MockOrder::new();
    let root = NodeId::root();
    let node = order.add_node("B1", &root, 1, 10);
    let mut outline = Outline::new();
    outline.add(&order, &pos(&root, 1)).unwrap();
    outline.add_run(&order, &pos(&node, 3), 4).unwrap();
    outline.delete(&order, &pos(&node, 4)).unwrap();
    outline.insert_at(&mut order, 0, 2).unwrap();

    let saved = outline.save();
    let mut loaded = Outline::new();
    loaded.load(&order, saved.clone()).unwrap();

    assert_eq!(loaded.len(), outline.len());
    let original = outline
        .positions(&order, ..)
        .unwrap()
        .collect::<poslist::Result<Vec<_>>>()
        .unwrap();
    let restored = loaded
        .positions(&order, ..)
        .unwrap()
        .collect::<poslist::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(original, restored);

    assert_eq!(
        serde_json::to_string(&saved).unwrap(),
        serde_json::to_string(&loaded.save()).unwrap(),
    );
}
