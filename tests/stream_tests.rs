use circle_stream::{
    Aggregator, Comparator, Consumer, Error, Executor, Filter, FlattenExecutor, FoldDirection,
    Iter, Mapper, NodeId, StageConfig, Stream, StreamNode, Tuple, Value,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

fn ints(xs: &[i64]) -> Vec<Value> {
    xs.iter().copied().map(Value::Int).collect()
}

fn fail_over_two() -> Filter {
    Filter::try_new(|x: i64| {
        if x > 2 {
            Err(format!("ERROR {}", x))
        } else {
            Ok(true)
        }
    })
}

#[test]
fn test_stream_chain() {
    let it = Stream::new(vec![1, 2, 3, 4])
        .map(Mapper::new(|x: i64| x * 2))
        .filter(Filter::new(|x: i64| x > 2))
        .execute()
        .unwrap();
    assert_eq!(it.collect_values().unwrap(), ints(&[4, 6, 8]));
}

#[test]
fn test_stream_without_stages_yields_source() {
    let s = Stream::new(vec![1, 2]);
    assert!(s.is_empty());
    assert_eq!(s.execute().unwrap().collect_values().unwrap(), ints(&[1, 2]));
}

#[test]
fn test_stage_ids_accumulate_outward() {
    let mut it = Stream::new(vec![1, 2, 3])
        .map_with(Mapper::new(|x: i64| x), "N1")
        .filter_with(fail_over_two(), "N2")
        .map_with(Mapper::new(|x: i64| x), "N3")
        .execute()
        .unwrap();

    assert_eq!(it.pull().unwrap(), Value::Int(1));
    assert_eq!(it.pull().unwrap(), Value::Int(2));
    let err = it.pull().unwrap_err();
    assert_eq!(err.to_string(), "N3 N2 ERROR 3");
    assert_eq!(err.stage_id(), Some("N3"));
    assert!(matches!(err.root(), Error::Failed(_)));
    assert!(matches!(it.pull(), Err(Error::Eoi)));
}

#[test]
fn test_generated_stage_ids_are_uuids() {
    let mut it = Stream::new(vec![3])
        .filter(fail_over_two())
        .execute()
        .unwrap();
    let err = it.pull().unwrap_err();
    let id = err.stage_id().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(err.to_string(), format!("{} ERROR 3", id));
}

#[test]
fn test_map_errors_are_not_tagged() {
    let mapper = Mapper::try_new(|x: i64| if x == 2 { Err("two") } else { Ok(x) });
    let it = Stream::new(vec![1, 2, 3])
        .map_with(mapper, "M")
        .execute()
        .unwrap();
    assert_eq!(it.collect_values().unwrap(), ints(&[1, 3]));
}

#[test]
fn test_aggregate_directions() {
    let right = Aggregator::new(|x: i64, acc: String| format!("({}+{})", x, acc)).unwrap();
    let got = Stream::new(vec![1, 2, 3])
        .aggregate(right.clone(), "iv")
        .execute()
        .unwrap()
        .collect_values()
        .unwrap();
    assert_eq!(got, vec![Value::from("(1+(2+(3+iv)))")]);

    let err = Stream::new(vec![1, 2, 3])
        .aggregate_with(right, "iv", StageConfig::new().node_id("agg").fold(FoldDirection::Left))
        .execute()
        .unwrap_err();
    assert!(matches!(err, Error::CannotCreateStream { ref stage, .. } if stage == "agg"));
    assert_eq!(err.to_string(), "cannot create stream agg invalid aggregate executor");
    assert!(matches!(err.root(), Error::InvalidAggregateExecutor));

    let left = Aggregator::new(|acc: String, x: i64| format!("({}+{})", acc, x)).unwrap();
    let got = Stream::new(vec![1, 2, 3])
        .aggregate_with(left, "iv", FoldDirection::Left)
        .execute()
        .unwrap()
        .collect_values()
        .unwrap();
    assert_eq!(got, vec![Value::from("(((iv+1)+2)+3)")]);
}

#[test]
fn test_construction_failure_stops_connection() {
    let built = Arc::new(Mutex::new(Vec::new()));
    let (b1, b2) = (Arc::clone(&built), Arc::clone(&built));
    let perfect = Aggregator::new(|x: i64, acc: i64| x + acc).unwrap();

    let connected = Stream::new(vec![1])
        .node(move |it| {
            b1.lock().unwrap().push("first");
            StreamNode::new(FlattenExecutor::new(it), Some("first".to_string()))
        })
        .aggregate_with(perfect, 0, StageConfig::new().node_id("bad").fold(FoldDirection::Right))
        .node(move |it| {
            b2.lock().unwrap().push("never");
            StreamNode::new(FlattenExecutor::new(it), None)
        })
        .execute();

    // Perfect aggregators accept either direction
    assert!(connected.is_ok());
    assert_eq!(*built.lock().unwrap(), vec!["first", "never"]);

    built.lock().unwrap().clear();
    let (b1, b2) = (Arc::clone(&built), Arc::clone(&built));
    let err = Stream::new(vec![1])
        .node(move |it| {
            b1.lock().unwrap().push("first");
            StreamNode::new(FlattenExecutor::new(it), Some("first".to_string()))
        })
        .node(|_| StreamNode::failed(Error::InvalidMapper, Some("bad".to_string())))
        .node(move |it| {
            b2.lock().unwrap().push("never");
            StreamNode::new(FlattenExecutor::new(it), None)
        })
        .execute()
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot create stream bad invalid mapper");
    assert_eq!(*built.lock().unwrap(), vec!["first"]);
}

#[test]
fn test_sort_and_flat() {
    let mut m = BTreeMap::new();
    m.insert("b", 2);
    m.insert("a", 1);
    m.insert("c", 3);

    let it = Stream::new(vec![m])
        .flat_with("F")
        .map(Mapper::tuple(|k: String, v: i64| format!("{}-{}", k, v)))
        .sort(Comparator::new(|x: String, y: String| y < x))
        .execute()
        .unwrap();
    assert_eq!(
        it.collect_values().unwrap(),
        vec![Value::from("c-3"), Value::from("b-2"), Value::from("a-1")]
    );
}

#[test]
fn test_consume() {
    let got = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&got);
    let result = Stream::new(vec![1, 2, 3, 4])
        .filter_with(fail_over_two(), "F")
        .consume(Consumer::new(move |x: i64| sink.lock().unwrap().push(x)));

    assert_eq!(result.unwrap_err().to_string(), "F ERROR 3");
    assert_eq!(*got.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_with_source_reuses_stages() {
    let doubled = Stream::new(()).map(Mapper::new(|x: i64| x * 2));
    assert_eq!(doubled.len(), 1);

    let a = doubled.with_source(vec![1, 2]).execute().unwrap();
    let b = doubled.with_source(vec![10]).execute().unwrap();
    assert_eq!(a.collect_values().unwrap(), ints(&[2, 4]));
    assert_eq!(b.collect_values().unwrap(), ints(&[20]));
    assert!(doubled.execute().unwrap().collect_values().unwrap().is_empty());
}

#[test]
fn test_stream_node() {
    let node = StreamNode::new(FlattenExecutor::new(Iter::new(vec![vec![1, 2]])), Some("n".into()));
    assert_eq!(node.id(), "n");
    assert!(node.err().is_none());
    assert_eq!(node.execute().unwrap().collect_values().unwrap(), ints(&[1, 2]));

    let failed = StreamNode::failed(Error::InvalidFilter, None);
    assert!(uuid::Uuid::parse_str(failed.id()).is_ok());
    assert!(matches!(failed.err(), Some(Error::InvalidFilter)));
    assert!(matches!(failed.execute(), Err(Error::CannotCreateIterator)));
}

#[test]
fn test_node_id() {
    assert_eq!(NodeId::new(Some("x".to_string())).as_str(), "x");
    assert_ne!(NodeId::new(Some(String::new())).as_str(), "");
    assert_ne!(NodeId::new(None), NodeId::new(None));
    assert_eq!(NodeId::new(Some("y".to_string())).to_string(), "y");
}

#[test]
fn test_stage_ids_tag_channel_errors() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let it = Stream::new(vec![1, 2, 3])
            .filter_with(fail_over_two(), "F")
            .execute()
            .unwrap();
        let (values, err) = it.channel().collect().await;
        assert_eq!(values, ints(&[1, 2]));
        assert_eq!(err.unwrap().to_string(), "F ERROR 3");
    });
}

#[test]
fn test_tuple_values_survive_stages() {
    let it = Stream::new(vec![(1, "a"), (2, "b")])
        .filter(Filter::tuple(|n: i64, _: String| n > 1))
        .execute()
        .unwrap();
    assert_eq!(it.collect_values().unwrap(), vec![Value::Tuple(Tuple::pair(2, "b"))]);
}
