use criterion::{Criterion, black_box, criterion_group, criterion_main};

use protwire::io::{CodedWriter, CodedReader};
use protwire::schema::{FieldDescriptor, KeyKind, Kind, MessageDescriptor};
use protwire::value::{DynamicMessage, MapKey, Value};
use protwire::collections::MapField;

macro_rules! add_write_group {
    ($g:ident, $n:expr, $f:ident, $v:expr) => {
        $g.bench_function($n, |b| {
            b.iter(|| {
                let mut writer = CodedWriter::with_capacity(10);
                writer.$f(black_box($v));
                black_box(writer);
            });
        });
    };
}

macro_rules! add_read_group {
    ($g:ident, $n:expr, $f:ident, $v:expr) => {
        $g.bench_function($n, |b| {
            b.iter(|| {
                let mut reader = CodedReader::with_slice(black_box($v));
                reader.$f().unwrap();
            });
        });
    };
}

static REMOTE: MessageDescriptor = MessageDescriptor::new("bench.Remote", &[
    FieldDescriptor::new(1, "name", Kind::String),
    FieldDescriptor::new(2, "url", Kind::String),
]);

static COMMIT: MessageDescriptor = MessageDescriptor::new("bench.Commit", &[
    FieldDescriptor::new(1, "hash", Kind::String),
    FieldDescriptor::new(2, "author_email", Kind::String),
    FieldDescriptor::new(3, "remotes", Kind::Message(&REMOTE)).repeated(),
    FieldDescriptor::new(4, "sizes", Kind::Int64).repeated(),
    FieldDescriptor::new(5, "labels", Kind::String).map(KeyKind::String),
]);

fn commit() -> DynamicMessage {
    let remotes: Vec<_> = (0..8)
        .map(|i| {
            let mut remote = DynamicMessage::new(&REMOTE);
            remote.set("name", Value::String(format!("remote-{}", i))).unwrap();
            remote.set("url", Value::String(format!("git@example.com:org/repo-{}.git", i))).unwrap();
            Value::Message(remote)
        })
        .collect();
    let labels: MapField<_, _> = (0..8)
        .map(|i| (MapKey::String(format!("label-{}", i)), Value::String(i.to_string())))
        .collect();

    let mut commit = DynamicMessage::new(&COMMIT);
    commit.set("hash", Value::from("4b825dc642cb6eb9a060e54bf8d69288fbee4904")).unwrap();
    commit.set("author_email", Value::from("dev@example.com")).unwrap();
    commit.set("remotes", remotes).unwrap();
    commit.set("sizes", (0..64).map(|i| Value::I64(i * 1_000_003)).collect::<Vec<_>>()).unwrap();
    commit.set("labels", labels).unwrap();
    commit
}

fn write_varint32(c: &mut Criterion) {
    let mut group = c.benchmark_group("write-varint32");
    group.bench_function("0-byte", |b| {
        b.iter(|| {
            let writer = CodedWriter::with_capacity(10);
            black_box(writer);
            // do nothing as a baseline
        })
    });
    add_write_group!(group, "1-byte", write_varint32, 127);
    add_write_group!(group, "2-byte", write_varint32, 16_383);
    add_write_group!(group, "3-byte", write_varint32, 2_097_151);
    add_write_group!(group, "4-byte", write_varint32, 268_435_455);
    add_write_group!(group, "5-byte", write_varint32, u32::MAX);
    group.finish();
}

fn write_varint64(c: &mut Criterion) {
    let mut group = c.benchmark_group("write-varint64");
    add_write_group!(group, "1-byte", write_varint64, 127);
    add_write_group!(group, "10-byte", write_varint64, u64::MAX);
    group.finish();
}

fn read_varint32(c: &mut Criterion) {
    let mut group = c.benchmark_group("read-varint32");
    add_read_group!(group, "1-byte", read_varint32, &[0x7F]);
    add_read_group!(group, "2-byte", read_varint32, &[0xFF, 0x7F]);
    add_read_group!(group, "3-byte", read_varint32, &[0xFF, 0xFF, 0x7F]);
    add_read_group!(group, "4-byte", read_varint32, &[0xFF, 0xFF, 0xFF, 0x7F]);
    add_read_group!(group, "5-byte", read_varint32, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    group.finish();
}

fn read_varint64(c: &mut Criterion) {
    let mut group = c.benchmark_group("read-varint64");
    add_read_group!(group, "1-byte", read_varint64, &[0x7F]);
    add_read_group!(group, "10-byte", read_varint64, &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    group.finish();
}

fn message(c: &mut Criterion) {
    let commit = commit();
    let bytes = commit.encode().unwrap();
    let json = commit.to_json().unwrap();

    let mut group = c.benchmark_group("message");
    group.bench_function("encode", |b| b.iter(|| black_box(&commit).encode().unwrap()));
    group.bench_function("decode", |b| b.iter(|| DynamicMessage::decode(&COMMIT, black_box(&bytes)).unwrap()));
    group.bench_function("to-json", |b| b.iter(|| black_box(&commit).to_json().unwrap()));
    group.bench_function("from-json", |b| b.iter(|| DynamicMessage::from_json(&COMMIT, black_box(&json)).unwrap()));
    group.finish();
}

criterion_group!(benches, write_varint32, write_varint64, read_varint32, read_varint64, message);
criterion_main!(benches);
