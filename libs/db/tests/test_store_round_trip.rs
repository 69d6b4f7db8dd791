/// End-to-end tests: typed record shapes written through a RowStore and read
/// back through the codec.
///
/// Layout under test: one RocksDB column family per wide-column family,
/// keys are `len(row_key) | row_key | qualifier`, so a row read is a single
/// prefix scan that comes back already qualifier-sorted.
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use widerow_db::{
    json, CodecError, FieldKind, FieldSpec, RecordShape, RecordValue, Resolution, RowStore,
    Schema, SchemaCache, ShapeCodec, StoreConfig, TimestampMicros, Value,
};

#[derive(Debug, Clone, PartialEq)]
struct Address {
    city: String,
    zip: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
struct Profile {
    id: i64,
    name: String,
    tags: String,
    home: Option<Address>,
}

impl Address {
    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::scalar("city", widerow_db::ScalarType::Text),
            FieldSpec::optional("zip", FieldKind::scalar(widerow_db::ScalarType::Int32)),
        ]
    }

    fn to_record(&self) -> RecordValue {
        RecordValue::new().with("city", self.city.clone()).with(
            "zip",
            match self.zip {
                Some(zip) => Value::some(Value::Int32(zip)),
                None => Value::none(),
            },
        )
    }

    fn from_record(mut record: RecordValue) -> widerow_db::Result<Self> {
        let zip = match record.take_optional("zip")? {
            Some(Value::Int32(zip)) => Some(zip),
            Some(other) => {
                return Err(CodecError::SchemaMismatch {
                    qualifier: "zip".to_string(),
                    reason: format!("unexpected {}", other.type_name()),
                })
            }
            None => None,
        };
        Ok(Address {
            city: record.take_scalar("city")?,
            zip,
        })
    }
}

impl RecordShape for Profile {
    fn schema() -> widerow_db::Result<Schema> {
        Schema::new(
            "profile",
            vec![
                FieldSpec::scalar("id", widerow_db::ScalarType::Int64),
                FieldSpec::scalar("name", widerow_db::ScalarType::Text)
                    .with_default("anonymous"),
                FieldSpec::scalar("tags", widerow_db::ScalarType::Text).with_default(""),
                FieldSpec::optional("home", FieldKind::record(Address::fields())),
            ],
        )
    }

    fn to_record(&self) -> RecordValue {
        RecordValue::new()
            .with("id", self.id)
            .with("name", self.name.clone())
            .with("tags", self.tags.clone())
            .with(
                "home",
                match &self.home {
                    Some(home) => Value::some(home.to_record().into()),
                    None => Value::none(),
                },
            )
    }

    fn from_record(mut record: RecordValue) -> widerow_db::Result<Self> {
        let home = match record.take_optional("home")? {
            Some(Value::Record(home)) => Some(Address::from_record(home)?),
            Some(other) => {
                return Err(CodecError::SchemaMismatch {
                    qualifier: "home".to_string(),
                    reason: format!("unexpected {}", other.type_name()),
                })
            }
            None => None,
        };
        Ok(Profile {
            id: record.take_scalar("id")?,
            name: record.take_scalar("name")?,
            tags: record.take_scalar("tags")?,
            home,
        })
    }
}

fn open_store(temp_dir: &TempDir) -> RowStore {
    RowStore::open(
        temp_dir.path().join("rows"),
        ["profile", "audit"],
        &StoreConfig::default(),
    )
    .expect("Failed to open store")
}

fn sample() -> Profile {
    Profile {
        id: 42,
        name: "Ada".to_string(),
        tags: "admin,ops".to_string(),
        home: Some(Address {
            city: "London".to_string(),
            zip: None,
        }),
    }
}

#[test]
fn test_typed_record_survives_store() {
    widerow_core::telemetry::init_test_subscriber();
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    let codec = SchemaCache::new().codec::<Profile>().unwrap();

    let mutation = codec
        .to_mutation("user#42", "profile", TimestampMicros(1_000), &sample())
        .unwrap();
    store.apply(&mutation).unwrap();

    let row = store.read_row(b"user#42").unwrap().expect("row exists");
    let qualifiers: Vec<_> = row
        .columns("profile")
        .iter()
        .map(|c| c.qualifier_lossy().into_owned())
        .collect();
    assert_eq!(qualifiers, vec!["home.city", "id", "name", "tags"]);

    let decoded = codec.decode_row(&row, "profile").unwrap();
    assert_eq!(decoded, Resolution::Found(sample()));
}

#[test]
fn test_defaults_fill_sparse_rows() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    let codec: ShapeCodec<Profile> = SchemaCache::new().codec().unwrap();

    // Only "id" stored, e.g. by an older writer.
    let mut mutation = widerow_db::RowMutation::new("user#7");
    mutation.set_cell("profile", "id", 7_i64.to_be_bytes().to_vec(), TimestampMicros(1));
    store.apply(&mutation).unwrap();

    let row = store.read_row(b"user#7").unwrap().unwrap();
    let decoded = codec.decode_row(&row, "profile").unwrap();
    assert!(decoded.is_found());
    assert_eq!(
        decoded.into_value().unwrap(),
        Profile {
            id: 7,
            name: "anonymous".to_string(),
            tags: String::new(),
            home: None,
        }
    );
}

#[test]
fn test_missing_required_field_names_qualifier() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    let codec = SchemaCache::new().codec::<Profile>().unwrap();

    let mut mutation = widerow_db::RowMutation::new("user#9");
    mutation.set_cell("profile", "home.zip", 1_i32.to_be_bytes().to_vec(), TimestampMicros(1));
    mutation.set_cell("profile", "id", 9_i64.to_be_bytes().to_vec(), TimestampMicros(1));
    store.apply(&mutation).unwrap();

    let row = store.read_row(b"user#9").unwrap().unwrap();
    let err = codec.decode_row(&row, "profile").unwrap_err();
    assert_eq!(
        err,
        CodecError::MissingRequiredField {
            qualifier: "home.city".to_string()
        }
    );
}

#[test]
fn test_other_family_is_invisible_to_decode() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    let codec = SchemaCache::new().codec::<Profile>().unwrap();

    store
        .apply(&codec.to_mutation("u1", "profile", TimestampMicros(5), &sample()).unwrap())
        .unwrap();
    let mut audit = widerow_db::RowMutation::new("u1");
    audit.set_cell("audit", "id", b"not an int".to_vec(), TimestampMicros(6));
    store.apply(&audit).unwrap();

    let row = store.read_row(b"u1").unwrap().unwrap();
    assert_eq!(row.families().len(), 2);
    assert_eq!(
        codec.decode_row(&row, "profile").unwrap().into_value().unwrap(),
        sample()
    );
    assert!(matches!(
        codec.decode_row(&row, "audit"),
        Err(CodecError::MalformedCellValue { .. })
    ));
}

#[test]
fn test_json_record_through_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    let schema = Arc::new(Profile::schema().unwrap());
    let codec = widerow_db::RecordCodec::new(Arc::clone(&schema));

    let input = serde_json::json!({ "id": 3, "home": { "city": "Paris", "zip": 75001 } });
    let record = json::record_from_json(&schema, &input).unwrap();
    store
        .apply(&codec.to_mutation("u3", "profile", TimestampMicros(2), &record).unwrap())
        .unwrap();

    let row = store.read_row(b"u3").unwrap().unwrap();
    let decoded = codec.decode_row(&row, "profile").unwrap().into_value().unwrap();
    assert_eq!(
        json::record_to_json(&schema, &decoded).unwrap(),
        serde_json::json!({
            "id": 3,
            "name": "anonymous",
            "tags": "",
            "home": { "city": "Paris", "zip": 75001 }
        })
    );
}

#[test]
fn test_concurrent_decode_shares_codec() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&temp_dir));
    let cache = Arc::new(SchemaCache::new());

    for id in 0..16_i64 {
        let codec = cache.codec::<Profile>().unwrap();
        let mut profile = sample();
        profile.id = id;
        let mutation = codec
            .to_mutation(format!("user#{id}"), "profile", TimestampMicros(id), &profile)
            .unwrap();
        store.apply(&mutation).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let codec = cache.codec::<Profile>().unwrap();
                for id in (worker..16).step_by(4) {
                    let row = store
                        .read_row(format!("user#{id}").as_bytes())
                        .unwrap()
                        .unwrap();
                    let profile = codec.decode_row(&row, "profile").unwrap().into_value().unwrap();
                    assert_eq!(profile.id, id as i64);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
    assert_eq!(cache.len(), 1);
}
