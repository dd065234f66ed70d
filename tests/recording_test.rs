mod common;

use fakecall::adapters::storage::json_file::JsonFileCallStorage;
use fakecall::domain::call::WritableCall;
use fakecall::domain::ports::CallStorage;
use fakecall::{
    FakeError, FakeResult, Faker, MethodInfo, ParameterInfo, RecordingSession, TypeInfo, Value,
    ValueKind,
};
use std::sync::Arc;
use tempfile::TempDir;

fn cache_type() -> Arc<TypeInfo> {
    TypeInfo::interface("ICache")
        .method(
            MethodInfo::new("TryGet")
                .param(ParameterInfo::new("key", ValueKind::Str))
                .param(ParameterInfo::out("value", ValueKind::Int))
                .returns(ValueKind::Bool),
        )
        .method(MethodInfo::new("Clear"))
        .build()
}

fn real_cache(call: &mut WritableCall) -> FakeResult<()> {
    use fakecall::domain::call::FakeCall;
    match call.method().name.as_str() {
        "TryGet" => {
            call.set_argument_value(1, Value::Int(42))?;
            call.set_return_value(Value::Bool(true));
        }
        _ => call.set_return_value(Value::Unit),
    }
    Ok(())
}

#[test]
fn test_recording_round_trips_through_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recordings").join("cache.json");
    let faker = Faker::new();

    let storage = Arc::new(JsonFileCallStorage::new(&path));
    let session = RecordingSession::open(storage.clone()).unwrap();
    assert!(!session.is_replaying());
    let cache = session.fake(&faker, &cache_type(), real_cache).unwrap();
    let outcome = cache.call("TryGet", vec!["a".into(), Value::Int(0)]);
    assert!(outcome.returns::<bool>());
    assert_eq!(outcome.output::<i64>(0), Some(42));
    cache.call("Clear", vec![]);
    session.save().unwrap();
    assert!(path.exists());

    let saved = storage.load().unwrap().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].output_arguments, vec![Value::Int(42)]);

    let replay = RecordingSession::open(storage).unwrap();
    assert!(replay.is_replaying());
    assert_eq!(replay.pending(), 2);
    let cache = replay
        .fake(&faker, &cache_type(), |_: &mut WritableCall| -> FakeResult<()> {
            panic!("the real cache must not be used while replaying")
        })
        .unwrap();
    let outcome = cache.call("TryGet", vec!["a".into(), Value::Int(0)]);
    assert_eq!(outcome.output::<i64>(0), Some(42));
    assert_eq!(replay.pending(), 1);
}

#[test]
fn test_replay_rejects_calls_out_of_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    let faker = Faker::new();
    let storage = Arc::new(JsonFileCallStorage::new(&path));

    let session = RecordingSession::open(storage.clone()).unwrap();
    let cache = session.fake(&faker, &cache_type(), real_cache).unwrap();
    cache.call("Clear", vec![]);
    session.save().unwrap();

    let replay = RecordingSession::open(storage).unwrap();
    let cache = replay.fake(&faker, &cache_type(), real_cache).unwrap();
    let err = cache
        .try_call("TryGet", vec!["a".into(), Value::Int(0)])
        .unwrap_err();
    assert!(matches!(err, FakeError::Expectation(_)));
    assert!(err.to_string().contains("does not match the next recorded call"));
}

#[test]
fn test_corrupt_recording_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "not json").unwrap();
    let err = RecordingSession::open(Arc::new(JsonFileCallStorage::new(&path)))
        .err()
        .unwrap();
    assert!(format!("{:#}", err).contains("Failed to parse call recording"));
}
