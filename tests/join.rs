use structerr::{ErrorRef, StructuredError, cause, join, join_if};

#[derive(Debug, thiserror::Error)]
#[error("e{0}")]
struct Numbered(usize);

fn messages(err: &StructuredError) -> Vec<String> {
    err.errors()
        .iter()
        .map(|cause| cause.as_ref().map(ToString::to_string).unwrap_or_default())
        .collect()
}

#[test]
fn join_keeps_present_causes_in_order() {
    for n in 0..6usize {
        for mask in 0..(1u32 << n) {
            let inputs: Vec<Option<ErrorRef>> = (0..n)
                .map(|i| (mask & (1 << i) != 0).then(|| cause(Numbered(i))))
                .collect();
            let expected: Vec<String> = (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| format!("e{i}"))
                .collect();

            match join(inputs) {
                Some(joined) => {
                    assert!(joined.is_joined());
                    assert_eq!(messages(&joined), expected);
                }
                None => assert!(expected.is_empty()),
            }
        }
    }
}

#[test]
fn join_of_nothing_is_none() {
    assert!(join(Vec::<ErrorRef>::new()).is_none());
    assert!(join([None::<ErrorRef>, None, None]).is_none());
}

#[test]
fn join_if_requires_the_first_cause() {
    assert!(join_if([None, Some(cause(Numbered(2))), Some(cause(Numbered(3)))]).is_none());
    assert!(join_if(Vec::<Option<ErrorRef>>::new()).is_none());

    let joined = join_if([Some(cause(Numbered(1))), None, Some(cause(Numbered(3)))]).unwrap();
    assert_eq!(messages(&joined), ["e1", "e3"]);
}

#[test]
fn joined_aggregates_nest() {
    let inner = join([cause(Numbered(1)), cause(Numbered(2))]).unwrap();
    let outer = join([Some(inner), None]).unwrap();
    assert_eq!(outer.errors().len(), 1);

    let nested = outer.errors()[0]
        .as_ref()
        .and_then(|cause| cause.as_structured())
        .unwrap();
    assert!(nested.is_joined());
    assert_eq!(messages(nested), ["e1", "e2"]);
}
