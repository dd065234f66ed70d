mod common;

use common::fixtures::{FooFake, foo_type};
use fakecall::{FakeError, Faker, Repeated, call_to, ordered_assertions};

fn foo() -> fakecall::Fake<FooFake> {
    Faker::new().fake_shim::<FooFake>(&foo_type()).unwrap()
}

#[test]
fn test_calls_asserted_in_interception_order_pass() {
    let foo = foo();
    foo.bar();
    foo.run();

    let _scope = ordered_assertions().unwrap();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
    call_to(|| {
        foo.run();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
}

#[test]
fn test_calls_asserted_out_of_order_fail() {
    let foo = foo();
    foo.bar();
    foo.run();

    let _scope = ordered_assertions().unwrap();
    call_to(|| {
        foo.run();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
    let err = call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap_err();

    assert!(matches!(err, FakeError::Expectation(_)));
    let message = err.to_string();
    assert!(message.starts_with("Assertion failed for the following calls:\n"));
    assert!(message.contains("  IFoo.Run() at least once\n"));
    assert!(message.contains("  IFoo.Bar() at least once\n"));
    assert!(message.contains("1: IFoo.Bar()"));
    assert!(message.contains("2: IFoo.Run()"));
}

#[test]
fn test_order_spans_multiple_fakes() {
    let first = foo();
    let second = foo();
    first.bar();
    second.bar();
    first.run();

    let _scope = ordered_assertions().unwrap();
    call_to(|| {
        first.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
    call_to(|| {
        second.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
    call_to(|| {
        first.run();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
}

#[test]
fn test_repeated_call_consumes_only_what_is_needed() {
    let foo = foo();
    foo.bar();
    foo.run();
    foo.bar();

    let _scope = ordered_assertions().unwrap();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened_times(Repeated::once())
    .unwrap();
    call_to(|| {
        foo.run();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
}

#[test]
fn test_scope_ends_when_guard_drops() {
    let foo = foo();
    foo.bar();
    foo.run();

    {
        let _scope = ordered_assertions().unwrap();
        call_to(|| {
            foo.run();
        })
        .unwrap()
        .must_have_happened()
        .unwrap();
    }

    // Outside the scope the cursor no longer applies.
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
}

#[test]
fn test_unordered_failure_lists_calls() {
    let foo = foo();
    foo.bar();
    foo.bar();

    let err = call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened_once_exactly()
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Assertion failed for the following call:\n  IFoo.Bar()\n\
         Expected to find it exactly once but found it twice among the calls:\n\
         \x20 1: IFoo.Bar() repeated 2 times\n"
    );
}

#[test]
fn test_must_not_have_happened() {
    let foo = foo();
    foo.run();

    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_not_have_happened()
    .unwrap();

    let err = call_to(|| {
        foo.run();
    })
    .unwrap()
    .must_not_have_happened()
    .unwrap_err();
    assert!(err.to_string().contains("Expected to find it never but found it once"));
}

#[test]
fn test_later_scope_continues_after_earlier_scope() {
    let foo = foo();
    foo.bar();
    foo.run();

    {
        let _scope = ordered_assertions().unwrap();
        call_to(|| {
            foo.run();
        })
        .unwrap()
        .must_have_happened()
        .unwrap();
    }

    let _scope = ordered_assertions().unwrap();
    let err = call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap_err();
    assert!(matches!(err, FakeError::Expectation(_)));
}

#[test]
fn test_later_scope_sees_calls_made_after_earlier_scope() {
    let foo = foo();
    foo.run();
    {
        let _scope = ordered_assertions().unwrap();
        call_to(|| {
            foo.run();
        })
        .unwrap()
        .must_have_happened()
        .unwrap();
    }

    foo.bar();
    let _scope = ordered_assertions().unwrap();
    call_to(|| {
        foo.bar();
    })
    .unwrap()
    .must_have_happened()
    .unwrap();
}
