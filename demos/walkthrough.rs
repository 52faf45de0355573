use poslist::{testing::MockOrder, IndexSearch, List};

fn main() {
    let mut order = MockOrder::new();
    let mut list = List::new();

    list.insert_at(&mut order, 0, vec!["hello"]).unwrap();
    list.insert_at(&mut order, 1, vec!["world"]).unwrap();
    let (comma, _) = list.insert_at(&mut order, 1, vec![","]).unwrap();

    // should print ["hello", ",", "world"]
    dbg!(list.values(&order).unwrap());

    // positions are stable references into the order: deleting in front of
    // the comma shifts its index, not its position
    list.delete_at(&order, 0, 1).unwrap();
    dbg!(list.index_of_position(&order, &comma, IndexSearch::Exact).unwrap());

    // save, then load into a fresh list sharing the same order
    let saved = list.save();
    dbg!(serde_json::to_string(&saved).unwrap());

    let mut restored = List::new();
    restored.load(&order, saved).unwrap();

    // should print [",", "world"]
    dbg!(restored.values(&order).unwrap());
}
