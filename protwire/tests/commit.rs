use assert_matches::assert_matches;
use protwire::io::read;
use protwire::json::{ErrorKind, Int64Repr};
use protwire::schema::{FieldDescriptor, Kind, MessageDescriptor};
use protwire::{DynamicMessage, Error, FieldValue, JsonOptions, Message, Result, Value};
use serde_json::json;

static REMOTE: MessageDescriptor = MessageDescriptor::new("git.Remote", &[
    FieldDescriptor::new(1, "name", Kind::String),
    FieldDescriptor::new(2, "url", Kind::String),
]);

static COMMIT: MessageDescriptor = MessageDescriptor::new("git.Commit", &[
    FieldDescriptor::new(1, "hash", Kind::String),
    FieldDescriptor::new(2, "author_email", Kind::String),
    FieldDescriptor::new(3, "remotes", Kind::Message(&REMOTE)).repeated(),
    FieldDescriptor::new(4, "size", Kind::Int64),
]);

#[derive(Clone, Debug, Default, PartialEq)]
struct Remote {
    name: String,
    url: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Commit {
    hash: String,
    author_email: String,
    remotes: Vec<Remote>,
    size: i64,
}

fn single<'a>(message: &'a DynamicMessage, field: &'static str, expected: &'static str) -> Result<&'a Value> {
    message
        .get(field)
        .and_then(FieldValue::as_single)
        .ok_or(Error::InvalidField { field, expected })
}

fn string(message: &DynamicMessage, field: &'static str) -> Result<String> {
    single(message, field, "string")?
        .as_str()
        .map(String::from)
        .ok_or(Error::InvalidField { field, expected: "string" })
}

impl Message for Remote {
    fn descriptor() -> &'static MessageDescriptor {
        &REMOTE
    }

    fn to_dynamic(&self) -> DynamicMessage {
        let mut message = DynamicMessage::new(&REMOTE);
        message.set("name", Value::from(self.name.as_str())).unwrap();
        message.set("url", Value::from(self.url.as_str())).unwrap();
        message
    }

    fn from_dynamic(message: &DynamicMessage) -> Result<Self> {
        message.expect_type(&REMOTE)?;
        Ok(Remote { name: string(message, "name")?, url: string(message, "url")? })
    }
}

impl Message for Commit {
    fn descriptor() -> &'static MessageDescriptor {
        &COMMIT
    }

    fn to_dynamic(&self) -> DynamicMessage {
        let mut message = DynamicMessage::new(&COMMIT);
        message.set("hash", Value::from(self.hash.as_str())).unwrap();
        message.set("author_email", Value::from(self.author_email.as_str())).unwrap();
        let remotes: Vec<_> = self.remotes.iter().map(|r| Value::Message(r.to_dynamic())).collect();
        message.set("remotes", remotes).unwrap();
        message.set("size", Value::I64(self.size)).unwrap();
        message
    }

    fn from_dynamic(message: &DynamicMessage) -> Result<Self> {
        message.expect_type(&COMMIT)?;
        let remotes = message
            .get("remotes")
            .and_then(FieldValue::as_list)
            .ok_or(Error::InvalidField { field: "remotes", expected: "list" })?
            .iter()
            .map(|value| match value {
                Value::Message(remote) => Remote::from_dynamic(remote),
                _ => Err(Error::InvalidField { field: "remotes", expected: "git.Remote" }),
            })
            .collect::<Result<Vec<_>>>()?;
        let size = single(message, "size", "int64")?
            .as_i64()
            .ok_or(Error::InvalidField { field: "size", expected: "int64" })?;
        Ok(Commit {
            hash: string(message, "hash")?,
            author_email: string(message, "author_email")?,
            remotes,
            size,
        })
    }
}

fn commit() -> Commit {
    Commit {
        hash: "abc".into(),
        author_email: "dev@example.com".into(),
        remotes: vec![Remote { name: "origin".into(), url: "git@host:repo".into() }],
        size: 0,
    }
}

#[test]
fn binary_round_trip() {
    let commit = commit();
    let bytes = commit.encode().unwrap();
    assert_eq!(Commit::decode(&bytes).unwrap(), commit);
}

#[test]
fn empty_fields_are_elided() {
    let commit = Commit { hash: "abc".into(), ..Commit::default() };
    assert_eq!(commit.encode().unwrap(), [0x0A, 0x03, b'a', b'b', b'c']);
    assert_eq!(Commit::decode(&[]).unwrap(), Commit::default());
}

#[test]
fn json_round_trip() {
    let commit = Commit { hash: "abc".into(), ..Commit::default() };
    let json = commit.to_json(&JsonOptions::default()).unwrap();
    assert_eq!(json, json!({ "hash": "abc", "authorEmail": "", "remotes": [], "size": 0 }));
    assert_eq!(Commit::from_json(&json, &JsonOptions::default()).unwrap(), commit);

    let commit = self::commit();
    let json = commit.to_json(&JsonOptions::default()).unwrap();
    assert_eq!(json["remotes"], json!([{ "name": "origin", "url": "git@host:repo" }]));
    assert_eq!(Commit::from_json(&json, &JsonOptions::default()).unwrap(), commit);
}

#[test]
fn large_sizes() {
    let commit = Commit { size: 1 << 53, ..Commit::default() };
    let json = commit.to_json(&JsonOptions::default()).unwrap();
    assert_eq!(json["size"], json!("9007199254740992"));
    assert_eq!(Commit::from_json(&json, &JsonOptions::default()).unwrap(), commit);

    let numbers = JsonOptions::default().with_int64(Int64Repr::Number);
    let err = commit.to_json(&numbers).unwrap_err();
    assert_matches!(err, Error::Json(e) if e.path == "size" && matches!(e.kind, ErrorKind::PrecisionLoss(_)));
}

#[test]
fn mismatched_types() {
    let err = Remote::from_dynamic(&DynamicMessage::new(&COMMIT)).unwrap_err();
    assert_matches!(err, Error::DescriptorMismatch { expected: "git.Remote", found: "git.Commit" });

    let mut message = DynamicMessage::new(&COMMIT);
    message.set("hash", Value::I32(5)).unwrap();
    assert_matches!(Commit::from_dynamic(&message), Err(Error::InvalidField { field: "hash", .. }));

    let err = Commit::from_json(&json!({ "remotes": [{ "url": false }] }), &JsonOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "remotes[0].url: expected string");
}

#[test]
fn malformed_input() {
    assert_matches!(Commit::decode(&[0x0A, 0x05, b'a']), Err(Error::Decode(read::Error::TruncatedBuffer { .. })));
    assert_matches!(Commit::decode(&[0x00]), Err(Error::Decode(read::Error::InvalidTag(0))));
}
