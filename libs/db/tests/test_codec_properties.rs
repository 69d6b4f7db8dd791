/// Property tests for the column codec.
///
/// - every scalar type decodes what it encodes, at its declared width
/// - a record survives encode -> assemble -> decode unchanged
/// - assembled families are always qualifier-sorted
/// - prefix lookups agree with a linear scan over the same columns
use num_bigint::BigInt;
use proptest::prelude::*;
use widerow_db::{
    Column, ColumnIndex, Decimal, FieldKind, FieldSpec, RecordCodec, RecordValue, Resolution,
    ScalarType, Schema, TimestampMicros, Value,
};

fn finite_f64() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite", |f| f.is_finite())
}

fn scalar_value(ty: ScalarType) -> BoxedStrategy<Value> {
    match ty {
        ScalarType::Int8 => any::<i8>().prop_map(Value::Int8).boxed(),
        ScalarType::Char => any::<u16>().prop_map(Value::Char).boxed(),
        ScalarType::Int16 => any::<i16>().prop_map(Value::Int16).boxed(),
        ScalarType::Int32 => any::<i32>().prop_map(Value::Int32).boxed(),
        ScalarType::Int64 => any::<i64>().prop_map(Value::Int64).boxed(),
        ScalarType::Float32 => any::<f32>()
            .prop_filter("not nan", |f| !f.is_nan())
            .prop_map(Value::Float32)
            .boxed(),
        ScalarType::Float64 => any::<f64>()
            .prop_filter("not nan", |f| !f.is_nan())
            .prop_map(Value::Float64)
            .boxed(),
        ScalarType::Bool => any::<bool>().prop_map(Value::Bool).boxed(),
        ScalarType::Bytes => proptest::collection::vec(any::<u8>(), 0..32)
            .prop_map(Value::Bytes)
            .boxed(),
        ScalarType::Text => ".{0,16}".prop_map(Value::Text).boxed(),
        ScalarType::BigInt => any::<i128>()
            .prop_map(|v| Value::BigInt(BigInt::from(v)))
            .boxed(),
        ScalarType::Decimal => (any::<i64>(), -6_i32..12)
            .prop_map(|(unscaled, scale)| Value::Decimal(Decimal::new(unscaled, scale)))
            .boxed(),
    }
}

fn any_scalar() -> impl Strategy<Value = (ScalarType, Value)> {
    proptest::sample::select(ScalarType::ALL.to_vec())
        .prop_flat_map(|ty| scalar_value(ty).prop_map(move |v| (ty, v)))
}

fn profile_schema() -> Schema {
    Schema::new(
        "profile",
        vec![
            FieldSpec::scalar("id", ScalarType::Int64),
            FieldSpec::scalar("name", ScalarType::Text),
            FieldSpec::scalar("score", ScalarType::Float64),
            FieldSpec::scalar("blob", ScalarType::Bytes),
            FieldSpec::scalar("big", ScalarType::BigInt),
            FieldSpec::optional(
                "home",
                FieldKind::record(vec![
                    FieldSpec::scalar("city", ScalarType::Text),
                    FieldSpec::optional("zip", FieldKind::scalar(ScalarType::Int32)),
                ]),
            ),
            FieldSpec::record(
                "meta",
                vec![
                    FieldSpec::scalar("tag", ScalarType::Text).with_default("t"),
                    FieldSpec::scalar("count", ScalarType::Int16),
                ],
            ),
            FieldSpec::optional("note", FieldKind::scalar(ScalarType::Text)),
        ],
    )
    .expect("valid schema")
}

fn optional<T: Into<Value>>(v: Option<T>) -> Value {
    match v {
        Some(v) => Value::some(v.into()),
        None => Value::none(),
    }
}

fn profile_record() -> impl Strategy<Value = RecordValue> {
    let head = (
        any::<i64>(),
        ".{0,12}",
        finite_f64(),
        proptest::collection::vec(any::<u8>(), 0..16),
        any::<i64>(),
    );
    let tail = (
        proptest::option::of(("[a-z]{0,8}", proptest::option::of(any::<i32>()))),
        ("[a-z]{0,8}", any::<i16>()),
        proptest::option::of(".{0,8}"),
    );

    (head, tail).prop_map(|((id, name, score, blob, big), (home, meta, note))| {
        let home = home.map(|(city, zip)| {
            Value::Record(
                RecordValue::new()
                    .with("city", city)
                    .with("zip", optional(zip)),
            )
        });
        RecordValue::new()
            .with("id", id)
            .with("name", name)
            .with("score", score)
            .with("blob", blob)
            .with("big", BigInt::from(big))
            .with("home", optional(home))
            .with(
                "meta",
                RecordValue::new().with("tag", meta.0).with("count", meta.1),
            )
            .with("note", optional(note))
    })
}

fn sorted_columns(qualifiers: Vec<String>) -> Vec<Column> {
    let mut qualifiers = qualifiers;
    qualifiers.sort();
    qualifiers.dedup();
    qualifiers
        .into_iter()
        .map(|q| Column::single(q.into_bytes(), vec![], TimestampMicros(0)))
        .collect()
}

proptest! {
    #[test]
    fn prop_scalar_round_trip((ty, value) in any_scalar()) {
        let codec = ty.codec();
        let bytes = codec.encode(&value).unwrap();
        if let Some(width) = codec.fixed_width() {
            prop_assert_eq!(bytes.len(), width);
        }
        prop_assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn prop_record_round_trip(record in profile_record()) {
        let codec = RecordCodec::new(profile_schema());
        let family = codec.encode_family("cf", TimestampMicros(1), &record).unwrap();
        prop_assert!(family.is_sorted());

        let decoded = codec.decode(&family.columns).unwrap();
        prop_assert_eq!(decoded, Resolution::Found(record));
    }

    #[test]
    fn prop_prefix_range_matches_linear_scan(
        qualifiers in proptest::collection::vec("[ab.-]{1,4}", 0..24),
        target in "[ab-]{1,2}",
    ) {
        let columns = sorted_columns(qualifiers);
        let index = ColumnIndex::new(&columns).unwrap();

        let dotted = format!("{target}.");
        let expected: Vec<&Column> = columns
            .iter()
            .filter(|c| c.qualifier.starts_with(dotted.as_bytes()))
            .collect();
        let actual: Vec<&Column> = index
            .prefix_range(target.as_bytes())
            .map(|span| span.iter().collect())
            .unwrap_or_default();
        prop_assert_eq!(actual, expected);

        let exact = columns.iter().find(|c| c.qualifier == target.as_bytes());
        prop_assert_eq!(index.exact(target.as_bytes()), exact);
    }
}
