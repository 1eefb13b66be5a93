use circle_stream::{
    Aggregator, Comparator, Consumer, Either, Error, Filter, FoldDirection, Func, Kind, Mapper,
    Maybe, Source, StageConfig, StreamBuilder, Value,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Shared log that consumers push rendered elements into.
fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn() -> Vec<String>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let view = Arc::clone(&log);
    (log, move || view.lock().unwrap().clone())
}

fn add_ten() -> Mapper {
    Mapper::try_new(|x: i64| {
        if x < 0 {
            Err(format!("negative: {}", x))
        } else {
            Ok(x + 10)
        }
    })
}

fn fail_over_two_else_even() -> Filter {
    Filter::try_new(|x: i64| {
        if x > 2 {
            Err(format!("ERROR {}", x))
        } else {
            Ok(x % 2 == 0)
        }
    })
}

fn push_int(log: &Arc<Mutex<Vec<String>>>) -> Consumer {
    let log = Arc::clone(log);
    Consumer::new(move |x: i64| log.lock().unwrap().push(x.to_string()))
}

#[test]
fn test_map_drops_failed_elements() {
    let (log, got) = recorder();
    let result = StreamBuilder::new(vec![1, 2, 3, -1, 4])
        .map(add_ten())
        .consume(push_int(&log));
    assert!(result.is_ok());
    assert_eq!(got(), vec!["11", "12", "13", "14"]);
}

#[test]
fn test_maybe_map() {
    let (log, got) = recorder();
    let nothing_log = Arc::clone(&log);
    let result = StreamBuilder::new(vec![
        Maybe::just(1),
        Maybe::nothing(),
        Maybe::just(3),
        Maybe::just(-1),
    ])
    .maybe_map(add_ten())
    .maybe_consume(
        push_int(&log),
        Consumer::unit(move || nothing_log.lock().unwrap().push("nothing".to_string())),
    );
    assert!(result.is_ok());
    assert_eq!(got(), vec!["11", "nothing", "13", "nothing"]);
}

#[test]
fn test_maybe_map_drops_non_maybe() {
    let it = StreamBuilder::new(vec![Value::Maybe(Maybe::just(1)), Value::Int(2)])
        .maybe_map(add_ten())
        .execute()
        .unwrap();
    assert_eq!(
        it.collect_values().unwrap(),
        vec![Value::Maybe(Maybe::just(11))]
    );
}

#[test]
fn test_either_map() {
    let (log, got) = recorder();
    let left_log = Arc::clone(&log);
    let result = StreamBuilder::new(vec![
        Either::right(1),
        Either::left("e1"),
        Either::right(3),
        Either::right(-1),
    ])
    .either_map(add_ten())
    .either_consume(
        Consumer::new(move |e: String| left_log.lock().unwrap().push(e)),
        push_int(&log),
    );
    assert!(result.is_ok());
    assert_eq!(got(), vec!["11", "e1", "13", "negative: -1"]);
}

#[test]
fn test_tuple_stages() {
    let (log, got) = recorder();
    let result = StreamBuilder::new(vec![1, 2, 3, 4, -1])
        .map(Mapper::new(|x: i64| (x, x * x)))
        .tuple_filter(|x: i64, _xx: i64| x > 0)
        .tuple_map(|x: i64, xx: i64| (x, xx, x * xx))
        .tuple_consume(move |x: i64, xx: i64, xxx: i64| {
            log.lock().unwrap().push(format!("{} {} {}", x, xx, xxx))
        });
    assert!(result.is_ok());
    assert_eq!(got(), vec!["1 1 1", "2 4 8", "3 9 27", "4 16 64"]);
}

#[test]
fn test_filter_error_stops_stream() {
    let (log, got) = recorder();
    let odd_or_fail = Filter::try_new(|x: i64| {
        if x < 0 {
            Err(format!("negative: {}", x))
        } else {
            Ok(x % 2 == 1)
        }
    });
    let err = StreamBuilder::new(vec![1, 2, 3, -1, 4, 5, 6])
        .filter_with(odd_or_fail, "f1")
        .consume(push_int(&log))
        .unwrap_err();
    assert_eq!(err.to_string(), "f1 negative: -1");
    assert_eq!(got(), vec!["1", "3"]);
}

#[test]
fn test_aggregate() {
    let (log, got) = recorder();
    let left = Aggregator::new(|acc: String, x: i64| format!("({}+{})", acc, x));
    let sink = Arc::clone(&log);
    StreamBuilder::new(vec![1, 2, 3])
        .aggregate(left, "iv")
        .consume(Consumer::new(move |x: String| sink.lock().unwrap().push(x)))
        .unwrap();

    let right = Aggregator::new(|x: i64, acc: String| format!("({}+{})", x, acc));
    let sink = Arc::clone(&log);
    StreamBuilder::new(vec![1, 2, 3])
        .aggregate(right, "iv")
        .consume(Consumer::new(move |x: String| sink.lock().unwrap().push(x)))
        .unwrap();

    assert_eq!(got(), vec!["(((iv+1)+2)+3)", "(1+(2+(3+iv)))"]);
}

#[test]
fn test_aggregate_construction_errors_use_stage_index() {
    let invalid = Aggregator::new(|_: i64, _: String| true);
    let err = StreamBuilder::new(vec![1])
        .aggregate(invalid, 0)
        .execute()
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot create stream 0 invalid aggregator");

    let right = Aggregator::new(|x: i64, acc: String| format!("{}{}", x, acc));
    let err = StreamBuilder::new(vec![1])
        .flat()
        .aggregate_with(right, "", FoldDirection::Left)
        .execute()
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot create stream 1 invalid aggregate executor");
}

#[test]
fn test_sort() {
    let (log, got) = recorder();
    StreamBuilder::new(vec![4, 1, 3, 2])
        .sort(Comparator::new(|x: i64, y: i64| x < y))
        .consume(push_int(&log))
        .unwrap();
    assert_eq!(got(), vec!["1", "2", "3", "4"]);
}

#[test]
fn test_flat() {
    let (log, got) = recorder();
    StreamBuilder::new(vec![vec![1], vec![2, 3]])
        .flat()
        .consume(push_int(&log))
        .unwrap();
    assert_eq!(got(), vec!["1", "2", "3"]);
}

#[test]
fn test_flat_map_source() {
    let mut m = BTreeMap::new();
    m.insert("c", 3);
    m.insert("a", 1);
    m.insert("b", 2);

    let it = StreamBuilder::new(Source::scalar(m))
        .flat()
        .tuple_map(|k: String, v: i64| format!("{}-{}", k, v))
        .sort(Comparator::new(|x: String, y: String| x < y))
        .execute()
        .unwrap();
    assert_eq!(
        it.collect_values().unwrap(),
        vec![Value::from("a-1"), Value::from("b-2"), Value::from("c-3")]
    );
}

#[test]
fn test_consume_error() {
    let (log, got) = recorder();
    let sink = Arc::clone(&log);
    let err = StreamBuilder::new(vec![1, 2, 3, 4, -1, 5, 6, 7])
        .consume(Consumer::try_new(move |x: i64| {
            if x < 0 {
                return Err(format!("negative: {}", x));
            }
            sink.lock().unwrap().push(x.to_string());
            Ok(())
        }))
        .unwrap_err();
    assert_eq!(err.to_string(), "negative: -1");
    assert_eq!(got(), vec!["1", "2", "3", "4"]);
}

#[test]
fn test_failed_to_create_stream_reports_stage_index() {
    let (log, got) = recorder();
    let not_a_filter = Func::new(vec![Kind::Int], Kind::Int, |args| Ok(args[0].clone()));
    let err = StreamBuilder::new(vec![1, 2, 3])
        .map(Mapper::new(|x: i64| x + 1))
        .filter(not_a_filter)
        .consume(push_int(&log))
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot create stream 1 invalid filter");
    assert!(matches!(err.root(), Error::InvalidFilter));
    assert!(got().is_empty());
}

#[test]
fn test_failed_to_create_consumer() {
    let (log, got) = recorder();
    let not_a_consumer = Func::new(vec![Kind::Int], Kind::Int, |args| Ok(args[0].clone()));
    let err = StreamBuilder::new(vec![1, 2, 3])
        .map(Mapper::new(|x: i64| x + 1))
        .filter(Filter::new(|x: i64| x % 2 == 1))
        .consume(not_a_consumer)
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot create stream 2 invalid consumer");

    let err = StreamBuilder::new(vec![1])
        .consume_with(Func::new(vec![], Kind::Unit, |_| Ok(Value::Unit)), "sink")
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot create stream sink invalid consumer");

    let mapper_shaped = Func::new(vec![Kind::Int], Kind::Int, |args| Ok(args[0].clone()));
    let err = StreamBuilder::new(vec![Maybe::just(1)])
        .maybe_consume(mapper_shaped, push_int(&log))
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot create stream 0 invalid consumer");
    assert!(got().is_empty());
}

#[test]
fn test_failed_to_yield_from_indexed_stage() {
    let (log, got) = recorder();
    let err = StreamBuilder::new(vec![1, 2, 3])
        .map(Mapper::new(|x: i64| x))
        .filter(fail_over_two_else_even())
        .consume(push_int(&log))
        .unwrap_err();
    assert_eq!(err.to_string(), "1 ERROR 3");
    assert_eq!(got(), vec!["2"]);
}

#[test]
fn test_failed_to_yield_accumulates_indexes() {
    let (log, got) = recorder();
    let err = StreamBuilder::new(vec![1, 2, 3])
        .map(Mapper::new(|x: i64| x + 1))
        .filter(fail_over_two_else_even())
        .map(Mapper::new(|x: i64| x * 2))
        .consume(push_int(&log))
        .unwrap_err();
    assert_eq!(err.to_string(), "2 1 ERROR 3");
    assert_eq!(got(), vec!["4"]);
}

#[test]
fn test_failed_to_yield_with_node_id() {
    let (log, got) = recorder();
    let err = StreamBuilder::new(vec![1, 2, 3])
        .map(Mapper::new(|x: i64| x + 1))
        .filter_with(fail_over_two_else_even(), StageConfig::new().node_id("NID"))
        .map(Mapper::new(|x: i64| x * 2))
        .consume(push_int(&log))
        .unwrap_err();
    assert_eq!(err.to_string(), "2 NID ERROR 3");
    assert_eq!(got(), vec!["4"]);
}

#[test]
fn test_dynamic_functions() {
    let inc = Func::new(vec![Kind::Int], Kind::Int, |args| match args.as_slice() {
        [Value::Int(x)] => Ok(Value::Int(x + 1)),
        _ => Err(Error::custom("expected one int")),
    });
    let odd = Func::new(vec![Kind::Int], Kind::Bool, |args| {
        Ok(Value::Bool(args[0].as_int().map_or(false, |x| x % 2 == 1)))
    });
    let it = StreamBuilder::new(vec![1, 2, 3, 4])
        .map(inc)
        .filter(odd)
        .execute()
        .unwrap();
    assert_eq!(
        it.collect_values().unwrap(),
        vec![Value::Int(3), Value::Int(5)]
    );
}

#[test]
fn test_builder_len() {
    let b = StreamBuilder::new(());
    assert!(b.is_empty());
    let b = b.flat().map(Mapper::new(|x: i64| x));
    assert_eq!(b.len(), 2);
    assert!(b.execute().unwrap().collect_values().unwrap().is_empty());
}
