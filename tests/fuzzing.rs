// only run this test if the "fuzzing" feature is enabled
// this test takes a while to run so we don't want it be run by Github CI
// we only manually run it:
// $ cargo test --features fuzzing --test fuzzing -- --nocapture
#![cfg(feature = "fuzzing")]

//! Our fuzz testing strategy is as follows:
//!
//! - Run 500 random operations (inserts at random indices, overwrites,
//!   deletes by position, deletes by index range, deletes of absent slots)
//!   against an `ItemList` backed by a `MockOrder`.
//!
//! - Mirror every operation in a plain `Vec<(Position, String)>`, which is
//!   trivially correct.
//!
//! - After every operation, check the structural invariants, the length, the
//!   values, and the index↔position translation in both directions for every
//!   entry.
//!
//! - Every 25 operations, save the list, load it into a fresh one sharing
//!   the same order, and check that the loaded list iterates identically and
//!   has structurally identical records.

use {
    anyhow::{ensure, Result},
    poslist::{testing::MockOrder, IndexSearch, ItemList, Position, ValueItems},
    rand::Rng,
    random_string::{charsets::ALPHANUMERIC, generate},
    std::collections::BTreeMap,
};

type TestList = ItemList<ValueItems<String>>;
type Model = Vec<(Position, String)>;

#[test]
fn fuzzing() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut rng = rand::thread_rng();
    let mut order = MockOrder::new();
    let mut list = TestList::new();
    let mut model: Model = vec![];

    for step in 0..500 {
        apply_random_op(&mut rng, &mut order, &mut list, &mut model).unwrap();
        if let Err(err) = check(&order, &list, &model) {
            panic!("step {step}: {err}");
        }
        if step % 25 == 24 {
            if let Err(err) = check_save_load(&order, &list) {
                panic!("step {step}: {err}");
            }
        }
    }

    println!("final length: {}, nodes: {}", list.len(), list.records().count());
}

fn rand_value<R: Rng>(rng: &mut R) -> String {
    generate(rng.gen_range(1..=8), ALPHANUMERIC)
}

fn apply_random_op<R: Rng>(
    rng: &mut R,
    order: &mut MockOrder,
    list: &mut TestList,
    model: &mut Model,
) -> Result<()> {
    match rng.gen_range(0..100) {
        // insert 1-3 values at a random index
        0..=39 => {
            let index = rng.gen_range(0..=model.len());
            let count = rng.gen_range(1..=3);
            let values = (0..count).map(|_| rand_value(rng)).collect::<Vec<_>>();

            let (start, _) = list.insert_at(order, index, values.clone())?;
            let entries = values
                .into_iter()
                .enumerate()
                .map(|(k, value)| (Position::new(start.node.clone(), start.slot + k), value))
                .collect::<Vec<_>>();
            model.splice(index..index, entries);
        },
        // overwrite an existing position
        40..=59 if !model.is_empty() => {
            let i = rng.gen_range(0..model.len());
            let value = rand_value(rng);
            list.set(order, &model[i].0, vec![value.clone()])?;
            model[i].1 = value;
        },
        // delete an existing position
        60..=79 if !model.is_empty() => {
            let i = rng.gen_range(0..model.len());
            let (pos, _) = model.remove(i);
            list.delete(order, &pos, 1)?;
        },
        // delete a short index range
        80..=89 if !model.is_empty() => {
            let index = rng.gen_range(0..model.len());
            let count = rng.gen_range(1..=model.len() - index).min(4);
            list.delete_at(order, index, count)?;
            model.drain(index..index + count);
        },
        // delete a slot that was never present (no-op)
        _ => {
            if let Some((pos, _)) = model.last() {
                let absent = Position::new(pos.node.clone(), pos.slot + 1000);
                list.delete(order, &absent, 1)?;
            }
        },
    }

    Ok(())
}

/// Compare the list against the reference model, entry by entry.
fn check(order: &MockOrder, list: &TestList, model: &Model) -> Result<()> {
    list.validate(order)?;
    ensure!(
        list.len() == model.len(),
        "length mismatch: list {}, model {}",
        list.len(),
        model.len(),
    );

    for (index, (position, value)) in model.iter().enumerate() {
        let at = list.position_at(order, index)?;
        ensure!(at == *position, "position mismatch at index {index}: {at:?} != {position:?}");

        let got = list.get(order, position)?;
        ensure!(
            got.as_ref() == Some(value),
            "value mismatch at index {index}: {got:?} != {value:?}",
        );

        let back = list.index_of_position(order, position, IndexSearch::Exact)?;
        ensure!(
            back == Some(index),
            "index mismatch for {position:?}: {back:?} != {index}",
        );
    }

    let entries = list.entries(order, ..)?.collect::<poslist::Result<Vec<_>>>()?;
    ensure!(entries.len() == model.len(), "iteration yields a different length");
    for (entry, expected) in entries.iter().zip(model) {
        ensure!(
            entry.0 == expected.0 && entry.1 == expected.1,
            "iteration disagrees with the model: {entry:?} != {expected:?}",
        );
    }

    Ok(())
}

/// Save, load into a fresh list, and compare the two.
fn check_save_load(order: &MockOrder, list: &TestList) -> Result<()> {
    let saved = list.save(Clone::clone);
    let mut loaded = TestList::new();
    loaded.load(order, saved, |values| values)?;
    loaded.validate(order)?;

    ensure!(loaded.len() == list.len(), "loaded list has a different length");

    let original = list.entries(order, ..)?.collect::<poslist::Result<Vec<_>>>()?;
    let restored = loaded.entries(order, ..)?.collect::<poslist::Result<Vec<_>>>()?;
    ensure!(original == restored, "loaded list iterates differently");

    let original: BTreeMap<_, _> = list.records().collect();
    let restored: BTreeMap<_, _> = loaded.records().collect();
    ensure!(original == restored, "loaded records differ structurally");

    Ok(())
}
