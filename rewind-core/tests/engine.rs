use rewind_core::{BoundedTimeline, Capacity, HistoryError, MasterIndex, PropertyHistory, SameValue, Slot};

fn value<V: Clone + SameValue>(log: &PropertyHistory<V>, master: &MasterIndex) -> Option<V> {
    log.get(master).defined().cloned()
}

#[test]
fn shared_clock_across_properties() {
    let mut master = MasterIndex::new();
    let mut width = PropertyHistory::new(&mut master, Slot::Defined(10u32));
    let mut label = PropertyHistory::new(&mut master, Slot::Defined("a".to_owned()));

    master.save_init();
    width.set(&mut master, Slot::Defined(20));
    label.set(&mut master, Slot::Defined("b".to_owned()));
    assert_eq!(master.current_index(), 1);

    master.save_init();
    label.set(&mut master, Slot::Defined("c".to_owned()));
    assert_eq!(master.current_index(), 2);

    master.undo(Some(1)).unwrap();
    assert_eq!(value(&width, &master), Some(20));
    assert_eq!(value(&label, &master).as_deref(), Some("b"));

    master.undo(None).unwrap();
    assert_eq!(value(&width, &master), Some(10));
    assert_eq!(value(&label, &master).as_deref(), Some("a"));
}

#[test]
fn property_created_later_reads_not_defined_before() {
    let mut master = MasterIndex::new();
    let mut a = PropertyHistory::new(&mut master, Slot::Defined(0));
    master.save_init();
    a.set(&mut master, Slot::Defined(1));
    master.save_init();
    let late = PropertyHistory::new(&mut master, Slot::Defined(5));
    assert_eq!(master.current_index(), 2);

    master.undo(Some(0)).unwrap();
    assert!(!late.get(&master).is_defined());
    master.redo(None).unwrap();
    assert!(!late.get(&master).is_defined());
    master.redo(None).unwrap();
    assert_eq!(value(&late, &master), Some(5));
}

#[test]
fn long_run_with_retention_and_branches() {
    let mut master = MasterIndex::new();
    master.set_max_history_size(8).unwrap();
    let mut log = PropertyHistory::new(&mut master, Slot::Defined(0u64));

    for step in 1..=100u64 {
        master.save_init();
        log.set(&mut master, Slot::Defined(step));
        if step % 10 == 0 {
            master.undo(None).unwrap();
        }
        assert!(master.min_index() <= master.current_index());
        assert!(master.current_index() <= master.max_index());
        assert!(master.current_index() - master.min_index() <= 8);
    }

    // the last step was undone
    assert_eq!(value(&log, &master), Some(99));
    master.redo(None).unwrap();
    assert_eq!(value(&log, &master), Some(100));
    assert_eq!(master.max_redo_possible(), 0);

    let head = master.current_index();
    master.undo(Some(master.min_index())).unwrap();
    assert!(value(&log, &master).is_some());
    master.redo(Some(head)).unwrap();
    assert_eq!(value(&log, &master), Some(100));
    assert!(log.revision_count() <= 12);
}

#[test]
fn timeline_from_signed_sizes() {
    assert!(matches!(
        BoundedTimeline::<u8>::with_size(-3),
        Err(HistoryError::Size { requested: -3 })
    ));
    let unlimited = BoundedTimeline::<u8>::with_size(0).unwrap();
    assert_eq!(unlimited.capacity(), Capacity::Unlimited);

    let capacity: Capacity = serde_json::from_str("4").unwrap();
    assert_eq!(capacity.limit(), Some(4));
    assert!(serde_json::from_str::<Capacity>("-1").is_err());
    assert_eq!(serde_json::to_string(&Capacity::Unlimited).unwrap(), "0");
}

#[test]
fn timeline_scenario() {
    let mut timeline = BoundedTimeline::with_size(2).unwrap();
    timeline.set(0, "A").unwrap();
    timeline.set(1, "B").unwrap();
    timeline.set(2, "C").unwrap();
    assert_eq!(timeline.min_index(), 1);
    assert_eq!(timeline.max_index(), Some(2));
    assert_eq!(timeline.get(0), None);
    assert_eq!(timeline.get(1), Some(&"B"));
    assert_eq!(timeline.get(2), Some(&"C"));
    assert!(matches!(timeline.set(4, "E"), Err(HistoryError::Index { .. })));
}
