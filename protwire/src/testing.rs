//! Strategies generating complete messages of the test descriptors

use crate::collections::MapField;
use crate::schema::test::{COMMIT, EVERYTHING, REMOTE};
use crate::value::{DynamicMessage, EnumValue, MapKey, Value};
use crate::wkt::{Duration, Timestamp};
use proptest::prelude::*;

pub(crate) fn remote(name: &str, url: &str) -> Value {
    let mut remote = DynamicMessage::new(&REMOTE);
    remote.set("name", Value::from(name)).unwrap();
    remote.set("url", Value::from(url)).unwrap();
    Value::Message(remote)
}

prop_compose! {
    pub(crate) fn commits()(hash in "[a-f0-9]{0,8}", urls in prop::collection::vec("[a-z]{0,5}", 0..3)) -> DynamicMessage {
        let mut commit = DynamicMessage::new(&COMMIT);
        commit.set("hash", Value::String(hash)).unwrap();
        let remotes: Vec<_> = urls.iter().map(|url| remote("origin", url)).collect();
        commit.set("remotes", remotes).unwrap();
        commit
    }
}

prop_compose! {
    fn scalars()(
        ints in (any::<i32>(), any::<i64>(), any::<u32>(), any::<u64>()),
        zigzags in (any::<i32>(), any::<i64>(), any::<u32>(), any::<u64>()),
        fixed in (any::<i32>(), any::<i64>(), -1e6f32..1e6f32, -1e12f64..1e12f64),
        other in (any::<bool>(), ".{0,6}", prop::collection::vec(any::<u8>(), 0..6), 0..3i32),
    ) -> Vec<(&'static str, Value)> {
        vec![
            ("int32_value", Value::I32(ints.0)),
            ("int64_value", Value::I64(ints.1)),
            ("uint32_value", Value::U32(ints.2)),
            ("uint64_value", Value::U64(ints.3)),
            ("sint32_value", Value::I32(zigzags.0)),
            ("sint64_value", Value::I64(zigzags.1)),
            ("fixed32_value", Value::U32(zigzags.2)),
            ("fixed64_value", Value::U64(zigzags.3)),
            ("sfixed32_value", Value::I32(fixed.0)),
            ("sfixed64_value", Value::I64(fixed.1)),
            ("float_value", Value::F32(fixed.2)),
            ("double_value", Value::F64(fixed.3)),
            ("bool_value", Value::Bool(other.0)),
            ("string_value", Value::String(other.1)),
            ("bytes_value", Value::Bytes(other.2)),
            ("status", Value::Enum(EnumValue::Known(other.3))),
        ]
    }
}

prop_compose! {
    /// Complete `test.Everything` messages. Timestamps and durations stay inside the range JSON can carry.
    pub(crate) fn everything()(
        scalars in scalars(),
        commit in prop::option::of(commits()),
        lists in (
            prop::collection::vec(any::<i32>(), 0..5),
            prop::collection::vec(any::<i64>(), 0..5),
            prop::collection::vec("[a-z]{0,4}", 0..3),
            prop::collection::vec(0..3i32, 0..4),
        ),
        maps in (
            prop::collection::hash_map("[a-z]{0,3}", "[a-z]{0,3}", 0..3),
            prop::collection::hash_map(any::<i32>(), any::<i64>(), 0..3),
        ),
        maybe_count in prop::option::of(any::<i32>()),
        created_at in prop::option::of((Timestamp::MIN_SECONDS..=Timestamp::MAX_SECONDS, 0..1_000_000_000i32)),
        timeout in prop::option::of((-1_000_000i64..1_000_000, -999_999_999..1_000_000_000i32)),
        choice in prop::option::of(prop_oneof![
            "[a-z]{0,3}".prop_map(|s| ("text", Value::String(s))),
            any::<i64>().prop_map(|n| ("number", Value::I64(n))),
        ]),
    ) -> DynamicMessage {
        let mut msg = DynamicMessage::new(&EVERYTHING);
        for (name, value) in scalars {
            msg.set(name, value).unwrap();
        }
        if let Some(commit) = commit {
            msg.set("commit", Value::Message(commit)).unwrap();
        }
        msg.set("numbers", lists.0.into_iter().map(Value::I32).collect::<Vec<_>>()).unwrap();
        msg.set("legacy_numbers", lists.1.into_iter().map(Value::I64).collect::<Vec<_>>()).unwrap();
        msg.set("tags", lists.2.into_iter().map(Value::String).collect::<Vec<_>>()).unwrap();
        msg.set("statuses", lists.3.into_iter().map(|n| Value::Enum(EnumValue::Known(n))).collect::<Vec<_>>()).unwrap();
        let labels: MapField<_, _> = maps.0.into_iter().map(|(k, v)| (MapKey::String(k), Value::String(v))).collect();
        msg.set("labels", labels).unwrap();
        let counts: MapField<_, _> = maps.1.into_iter().map(|(k, v)| (MapKey::I32(k), Value::I64(v))).collect();
        msg.set("counts", counts).unwrap();
        if let Some(n) = maybe_count {
            msg.set("maybe_count", Value::I32(n)).unwrap();
        }
        if let Some((seconds, nanos)) = created_at {
            msg.set("created_at", Value::Timestamp(Timestamp { seconds, nanos })).unwrap();
        }
        if let Some((seconds, nanos)) = timeout {
            msg.set("timeout", Value::Duration(Duration::new(seconds, nanos))).unwrap();
        }
        if let Some((name, value)) = choice {
            msg.set(name, value).unwrap();
        }
        msg
    }
}
