mod common;

use common::fixtures::{FooFake, foo_type, widget_type};
use fakecall::domain::call::{FakeCall, WritableCall};
use fakecall::{FakeError, FakeOptions, Faker, Value, arg, call_to, call_to_any};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn foo() -> fakecall::Fake<FooFake> {
    Faker::new().fake_shim::<FooFake>(&foo_type()).unwrap()
}

#[test]
fn test_latest_rule_wins() {
    let foo = foo();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns(1);
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns(2);

    assert_eq!(foo.bar(), 2);
}

#[test]
fn test_only_one_rule_applies_per_call() {
    let foo = foo();
    let applied = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let applied = Arc::clone(&applied);
        call_to(|| {
            foo.bar();
        })
        .unwrap()
        .invokes(move |_| {
            applied.fetch_add(1, Ordering::SeqCst);
        });
    }

    foo.bar();
    assert_eq!(applied.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exhausted_rule_falls_through_to_older_rule() {
    let foo = foo();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns(10);
    let limited = call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns(20)
    .twice();

    assert_eq!(foo.bar(), 20);
    assert_eq!(foo.bar(), 20);
    assert_eq!(foo.bar(), 10);
    assert_eq!(limited.rule().remaining(), Some(0));
    assert!(limited.rule().is_exhausted());
}

#[test]
fn test_exhausted_rule_still_matches() {
    let foo = foo();
    let config = call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns(5)
    .once();

    assert_eq!(foo.bar(), 5);
    assert_eq!(foo.bar(), 0);

    let last = foo.recorded_calls().pop().unwrap();
    assert!(config.rule().matches_call(last.as_ref()));
    assert!(!config.rule().is_applicable_to(last.as_ref()));
}

#[test]
fn test_applicability_check_has_no_side_effects() {
    let foo = foo();
    let config = call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns(5)
    .once();

    // A call on another fake of the same type matches without consuming.
    let probe = Faker::new().fake_shim::<FooFake>(&foo_type()).unwrap();
    probe.bar();
    let call = probe.recorded_calls().pop().unwrap();
    for _ in 0..10 {
        assert!(config.rule().is_applicable_to(call.as_ref()));
    }
    assert_eq!(config.rule().remaining(), Some(1));
    assert_eq!(foo.bar(), 5);
    assert_eq!(config.rule().remaining(), Some(0));
}

#[test]
fn test_sequence_of_return_values() {
    let foo = foo();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns_next_from_sequence(vec![1, 2, 3]);

    let values: Vec<i64> = (0..4).map(|_| foo.bar()).collect();
    assert_eq!(values, vec![1, 2, 3, 0]);
}

#[test]
fn test_argument_constraints_select_rule() {
    let foo = foo();
    call_to(|| {
        foo.baz(arg::starts_with("a"), arg::any::<String>());
    })
    .unwrap()
    .returns(1);
    call_to(|| {
        foo.baz(arg::ends_with("z"), arg::any::<String>());
    })
    .unwrap()
    .returns(2);

    assert_eq!(foo.baz("abc", ""), 1);
    assert_eq!(foo.baz("xyz", ""), 2);
    assert_eq!(foo.baz("amz", ""), 2);
    assert_eq!(foo.baz("q", ""), 0);
}

#[test]
fn test_when_arguments_match_replaces_constraints() {
    let foo = foo();
    call_to(|| {
        foo.baz("ignored", "ignored");
    })
    .unwrap()
    .when_arguments_match(|args| args.get(0) == args.get(1))
    .unwrap()
    .returns(7);

    assert_eq!(foo.baz("same", "same"), 7);
    assert_eq!(foo.baz("one", "two"), 0);
}

#[test]
fn test_where_clause_filters_and_describes() {
    let foo = foo();
    let config = call_to_any(&*foo)
        .where_call("method is Bar", |call| call.method().name == "Bar")
        .returns(3);

    assert_eq!(foo.bar(), 3);
    assert_eq!(foo.baz("a", "b"), 0);
    assert_eq!(
        config.rule().describe(),
        "Any call made to the fake object. where method is Bar"
    );
}

#[test]
fn test_any_call_with_return_type() {
    let foo = foo();
    call_to_any(&*foo)
        .with_return_type(fakecall::ValueKind::Int)
        .returns(42);

    assert_eq!(foo.bar(), 42);
    assert_eq!(foo.baz("a", "b"), 42);
    assert_eq!(foo.name(), "");
}

#[test]
fn test_actions_may_call_back_into_the_fake() {
    let foo = Arc::new(foo());
    let inner = Arc::clone(&foo);
    call_to(|| {
        foo.run();
    })
    .unwrap()
    .invokes(move |_| {
        inner.bar();
    });

    foo.run();
    let calls = foo.recorded_calls();
    assert_eq!(calls.len(), 2);
    // The outer call was intercepted first.
    assert_eq!(calls[0].method().name, "Run");
    assert_eq!(calls[1].method().name, "Bar");
}

#[test]
fn test_panicking_action_is_recorded_and_resumed() {
    let foo = foo();
    call_to(|| {
        foo.run();
    })
    .unwrap()
    .invokes(|_| panic!("action failed"));

    let result = catch_unwind(AssertUnwindSafe(|| foo.run()));
    assert!(result.is_err());
    assert_eq!(foo.recorded_calls().len(), 1);
}

#[test]
fn test_calls_base_method_without_base_is_a_configuration_error() {
    let foo = foo();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .calls_base_method();

    let err = foo.try_bar().unwrap_err();
    assert!(matches!(err, FakeError::Configuration(_)));
}

#[test]
fn test_throw_wins_over_base_call() {
    let base_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&base_calls);
    let widget = Faker::new()
        .fake_with(
            &widget_type(),
            FakeOptions::new().with_base(move |call: &mut WritableCall| -> fakecall::FakeResult<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                call.set_return_value(Value::from("base"));
                Ok(())
            }),
        )
        .unwrap();

    call_to(|| {
        widget.call("Render", vec![]);
    })
    .unwrap()
    .calls_base_method()
    .throws_message("nope");

    assert!(widget.try_call("Render", vec![]).is_err());
    assert_eq!(base_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_base_method_and_wrapped_object() {
    let widget = Faker::new()
        .fake_with(
            &widget_type(),
            FakeOptions::new().with_base(|call: &mut WritableCall| -> fakecall::FakeResult<()> {
                call.set_return_value(Value::from("base"));
                Ok(())
            }),
        )
        .unwrap();
    assert_eq!(widget.call("Render", vec![]).returns::<String>(), "");

    call_to(|| {
        widget.call("Render", vec![]);
    })
    .unwrap()
    .calls_base_method();
    assert_eq!(widget.call("Render", vec![]).returns::<String>(), "base");

    let wrapper = Faker::new()
        .fake_with(
            &widget_type(),
            FakeOptions::new().wrapping(|call: &mut WritableCall| -> fakecall::FakeResult<()> {
                call.set_return_value(Value::from("wrapped"));
                Ok(())
            }),
        )
        .unwrap();
    assert_eq!(wrapper.call("Render", vec![]).returns::<String>(), "wrapped");
}

#[test]
fn test_does_nothing_overrides_wrapped_object() {
    let wrapper = Faker::new()
        .fake_with(
            &widget_type(),
            FakeOptions::new().wrapping(|call: &mut WritableCall| -> fakecall::FakeResult<()> {
                call.set_return_value(Value::from("wrapped"));
                Ok(())
            }),
        )
        .unwrap();
    call_to(|| {
        wrapper.call("Render", vec![]);
    })
    .unwrap()
    .does_nothing();

    assert_eq!(wrapper.call("Render", vec![]).returns::<String>(), "");
}

#[test]
fn test_reset_drops_rules() {
    let foo = foo();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .returns(9);
    assert_eq!(foo.bar(), 9);
    foo.reset();
    assert_eq!(foo.bar(), 0);
    assert_eq!(foo.recorded_calls().len(), 2);
}
