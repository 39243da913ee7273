use std::rc::Rc;

use rewind::{trackable, HistoryError, Tracked, Tracker, UndoRedo, UndoRedoError};

struct Test {
    tracker: Tracker,
    prop1: Tracked<i32>,
    prop2: Tracked<Option<String>>,
}

trackable!(Test => tracker { prop1, prop2 });

fn setup(prop2: Option<&str>) -> (Rc<Test>, UndoRedo) {
    let t = Rc::new(Test {
        tracker: Tracker::new(),
        prop1: Tracked::new(0),
        prop2: Tracked::new(prop2.map(str::to_owned)),
    });
    let mut ud = UndoRedo::new();
    ud.add(t.clone()).unwrap();
    (t, ud)
}

fn save_values(t: &Test, ud: &mut UndoRedo, values: &[i32]) {
    for &v in values {
        t.prop1.set(v);
        ud.save().unwrap();
    }
}

#[test]
fn collapse_keeps_live_value() {
    let (t, mut ud) = setup(None);
    ud.save().unwrap();
    save_values(&t, &mut ud, &[1, 2, 3, 4]);
    assert_eq!(ud.current_index(), 4);

    ud.collapse(2).unwrap();
    assert_eq!(t.prop1.get(), 4);
    assert_eq!(ud.current_index(), 2);
    assert_eq!(ud.max_redo_possible(), 0);

    ud.undo(None).unwrap();
    assert_eq!(t.prop1.get(), 1);
    ud.redo(None).unwrap();
    assert_eq!(t.prop1.get(), 4);
}

#[test]
fn collapse_after_undo() {
    let (t, mut ud) = setup(None);
    save_values(&t, &mut ud, &[1, 2, 3, 4]);

    ud.undo(None).unwrap();
    assert_eq!(t.prop1.get(), 3);
    assert_eq!(ud.current_index(), 3);
    assert_eq!(ud.max_redo_possible(), 1);

    ud.collapse(2).unwrap();
    assert_eq!(t.prop1.get(), 3);
    assert_eq!(ud.max_redo_possible(), 0);
    assert!(!ud.redo_possible());
}

#[test]
fn collapse_to_same_value() {
    let (t, mut ud) = setup(None);
    save_values(&t, &mut ud, &[1, 2, 3, 2]);
    assert_eq!(ud.current_index(), 4);

    ud.collapse(2).unwrap();
    assert_eq!(t.prop1.get(), 2);
    assert_eq!(ud.max_redo_possible(), 0);
    assert_eq!(t.prop1.revision_count(), 3);
}

#[test]
fn collapse_multiple_values() {
    let (t, mut ud) = setup(Some("a"));
    assert_eq!(ud.current_index(), 0);

    t.prop1.set(1);
    t.prop2.set(Some("b".into()));
    ud.save().unwrap();
    assert_eq!(ud.current_index(), 1);

    save_values(&t, &mut ud, &[2, 3]);
    assert_eq!(ud.current_index(), 3);

    ud.collapse(1).unwrap();
    assert_eq!(t.prop1.get(), 3);
    assert_eq!(t.prop2.get().as_deref(), Some("b"));
    assert_eq!(ud.current_index(), 1);
    assert_eq!(ud.max_redo_possible(), 0);

    ud.undo(None).unwrap();
    assert_eq!(ud.current_index(), 0);
    assert_eq!(t.prop1.get(), 0);
    assert_eq!(t.prop2.get().as_deref(), Some("a"));
    assert_eq!(ud.max_redo_possible(), 1);

    ud.redo(None).unwrap();
    assert_eq!(t.prop1.get(), 3);
    assert_eq!(t.prop2.get().as_deref(), Some("b"));
    assert_eq!(ud.current_index(), 1);
    assert_eq!(ud.max_redo_possible(), 0);
}

#[test]
fn collapse_value_created_later() {
    let (t, mut ud) = setup(None);
    save_values(&t, &mut ud, &[1, 2]);
    assert_eq!(t.prop2.get(), None);

    t.prop1.set(3);
    t.prop2.set(Some("a".into()));
    ud.save().unwrap();
    assert_eq!(ud.current_index(), 3);

    ud.collapse(1).unwrap();
    assert_eq!(t.prop1.get(), 3);
    assert_eq!(t.prop2.get().as_deref(), Some("a"));
    assert_eq!(ud.current_index(), 1);
    assert_eq!(ud.max_redo_possible(), 0);

    ud.undo(None).unwrap();
    assert_eq!(t.prop2.get(), None);
    ud.redo(None).unwrap();
    assert_eq!(t.prop2.get().as_deref(), Some("a"));
}

#[test]
fn collapse_then_save_continues_after_target() {
    let (t, mut ud) = setup(None);
    save_values(&t, &mut ud, &[1, 2, 3]);
    ud.collapse(1).unwrap();

    t.prop1.set(10);
    assert_eq!(ud.save().unwrap(), 2);
    ud.undo(None).unwrap();
    assert_eq!(t.prop1.get(), 3);
}

#[test]
fn collapse_out_of_range() {
    let (t, mut ud) = setup(None);
    save_values(&t, &mut ud, &[1, 2]);
    ud.undo(Some(1)).unwrap();

    let err = ud.collapse(2).unwrap_err();
    assert!(matches!(
        err,
        UndoRedoError::History(HistoryError::Index { index: 2, .. })
    ));
    assert_eq!(ud.current_index(), 1);
    assert_eq!(ud.max_redo_possible(), 1);
}
