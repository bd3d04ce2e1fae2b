use proptest::prelude::*;

#[allow(dead_code)]
pub(super) fn assert_eq_iters<I: Iterator, J: Iterator<Item = I::Item>>(
    mut i: I,
    mut j: J,
) where
    I::Item: std::fmt::Debug + Eq, // same inferred for J::Item
{
    loop {
        match (i.next(), j.next()) {
            (None, None) => return,
            (a, b) => assert_eq!(a, b),
        }
    }
}

// Routes the crate's log output through the test harness.  Safe to call from
// every test; only the first call installs the logger.
#[allow(dead_code)]
pub(super) fn init_logging() {
    use simplelog::{Config, LevelFilter, TestLogger};
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub(super) enum Op {
    Insert(u16, u16),
    Remove(u16),
    RemoveAll(u16),
}

// Keys are drawn from a narrow range so that duplicates and removals of
// present keys are common.
#[allow(dead_code)]
pub(super) fn ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        3 => (0u16..64, 0u16..1024).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => (0u16..64).prop_map(Op::Remove),
        1 => (0u16..64).prop_map(Op::RemoveAll),
    ];
    prop::collection::vec(op, 0..512)
}

#[allow(dead_code)]
pub(super) fn small_keys() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(0u16..1024, 0..256)
}
