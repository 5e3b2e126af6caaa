use super::*;

#[test]
fn intern_deduplicates() {
    let mut table = StringTable::new();
    let a = table.intern("point");
    let b = table.intern("point");
    let c = table.intern("pair");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(table.resolve(a), "point");
    assert_eq!(table.resolve(c), "pair");
}

#[test]
fn get_does_not_intern() {
    let mut table = StringTable::new();
    assert_eq!(table.get("x"), None);
    let a = table.intern("x");
    assert_eq!(table.get("x"), Some(a));
    assert_eq!(table.len(), 1);
}
