use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pathsub::{Path, PathKey, Paths, Router, Step, TraversalGraph};

#[derive(Debug, Clone)]
struct Inner {
    i: String,
    j: String,
}

#[derive(Debug, Clone)]
struct Record {
    a: String,
    b: String,
    w: Option<Inner>,
    x: Option<Inner>,
}

impl Record {
    fn new(a: &str, b: &str) -> Self {
        Self {
            a: a.to_string(),
            b: b.to_string(),
            w: None,
            x: None,
        }
    }

    fn with_w(mut self) -> Self {
        self.w = Some(Inner {
            i: "w.i".to_string(),
            j: "w.j".to_string(),
        });
        self
    }

    fn with_x(mut self) -> Self {
        self.x = Some(Inner {
            i: "x.i".to_string(),
            j: "x.j".to_string(),
        });
        self
    }
}

const U: PathKey = PathKey::Unconstrained;

/// Counts stage invocations by name.
#[derive(Default, Clone)]
struct Calls(Arc<Mutex<HashMap<&'static str, usize>>>);

impl Calls {
    fn hit(&self, stage: &'static str) {
        *self.0.lock().unwrap().entry(stage).or_default() += 1;
    }

    fn get(&self, stage: &'static str) -> usize {
        self.0.lock().unwrap().get(stage).copied().unwrap_or_default()
    }
}

/// Every field is optional: each depth emits the unconstrained marker next to
/// the concrete value, and an absent nested struct emits only the marker.
fn record_graph(calls: &Calls) -> TraversalGraph<Record> {
    fn nested(
        b: &mut pathsub::TraversalBuilder<Record>,
        calls: &Calls,
        name: &'static str,
        names: [&'static str; 2],
        field: fn(&Record) -> Option<&Inner>,
    ) -> pathsub::StageId {
        let c = calls.clone();
        let j = b.stage(names[1], move |r: &Record| {
            c.hit(names[1]);
            Paths::flat([U, PathKey::or_unconstrained(field(r).map(|n| n.j.as_str()))])
        });
        let c = calls.clone();
        let i = b.stage(names[0], move |r: &Record| {
            c.hit(names[0]);
            Paths::with_next([U, PathKey::or_unconstrained(field(r).map(|n| n.i.as_str()))], j)
        });
        let c = calls.clone();
        b.stage(name, move |r: &Record| {
            c.hit(name);
            match field(r) {
                Some(_) => Paths::with_next([name], i),
                None => Paths::flat([U]),
            }
        })
    }

    let mut b = TraversalGraph::builder();
    let x = nested(&mut b, calls, "x", ["x.i", "x.j"], |r| r.x.as_ref());
    let w = nested(&mut b, calls, "w", ["w.i", "w.j"], |r| r.w.as_ref());

    let c = calls.clone();
    let field_b = b.stage("b", move |r: &Record| {
        c.hit("b");
        Paths::from_steps([
            Step::new(U, w),
            Step::new(r.b.as_str(), w),
            Step::new(U, x),
            Step::new(r.b.as_str(), x),
        ])
    });

    let c = calls.clone();
    b.stage("a", move |r: &Record| {
        c.hit("a");
        Paths::with_next([U, PathKey::str(&r.a)], field_b)
    });
    b.build()
}

fn path(keys: Vec<PathKey>) -> Path {
    Path::new(keys).unwrap()
}

fn s(v: &str) -> PathKey {
    PathKey::str(v)
}

fn counting(router: &Router<Record>, keys: Vec<PathKey>) -> Arc<AtomicUsize> {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    router
        .subscribe_fn(path(keys), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    hits
}

fn counts(subs: &[Arc<AtomicUsize>]) -> Vec<usize> {
    subs.iter().map(|h| h.swap(0, Ordering::SeqCst)).collect()
}

#[test]
fn optional_fields_route_like_the_struct_walkthrough() {
    let router = Router::new();
    let subs = vec![
        counting(&router, vec![s("a"), s("b"), s("w"), s("w.i"), s("w.j")]),
        counting(&router, vec![s("a"), s("b"), s("x"), s("x.i"), s("x.j")]),
        counting(&router, vec![U, s("b"), s("x"), s("x.i"), s("x.j")]),
        counting(&router, vec![U, U, s("x"), s("x.i"), s("x.j")]),
        counting(&router, vec![U]),
    ];
    let graph = record_graph(&Calls::default());

    let report = router
        .publish(&Record::new("a", "b").with_w().with_x(), &graph)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(counts(&subs), vec![1, 1, 1, 1, 1]);

    router.publish(&Record::new("a", "b").with_x(), &graph).unwrap();
    assert_eq!(counts(&subs), vec![0, 1, 1, 1, 1]);

    router.publish(&Record::new("a'", "b'").with_x(), &graph).unwrap();
    assert_eq!(counts(&subs), vec![0, 0, 0, 1, 1]);

    router.publish(&Record::new("a", "b"), &graph).unwrap();
    assert_eq!(counts(&subs), vec![0, 0, 0, 0, 1]);
}

#[test]
fn unconstrained_first_key_fires_once_beside_literal_branch() {
    let router = Router::new();
    let literal = counting(&router, vec![s("a"), s("b"), s("x"), s("x.i"), s("x.j")]);
    let marker = counting(&router, vec![U, s("b"), s("x"), s("x.i"), s("x.j")]);
    let graph = record_graph(&Calls::default());

    let report = router.publish(&Record::new("a", "b").with_x(), &graph).unwrap();
    assert_eq!(report.delivered, 2);
    assert_eq!(literal.load(Ordering::SeqCst), 1);
    assert_eq!(marker.load(Ordering::SeqCst), 1);
}

#[test]
fn absent_substructure_only_matches_marker() {
    let router = Router::new();
    let concrete = counting(&router, vec![s("a"), s("b"), s("w")]);
    let marker = counting(&router, vec![s("a"), s("b"), U]);
    let graph = record_graph(&Calls::default());

    router.publish(&Record::new("a", "b").with_x(), &graph).unwrap();
    assert_eq!(concrete.load(Ordering::SeqCst), 0);
    assert_eq!(marker.load(Ordering::SeqCst), 1);
}

#[test]
fn diverging_subscriptions_count_independently() {
    let router = Router::new();
    let via_w = counting(&router, vec![s("a"), s("b"), s("w"), s("w.i")]);
    let via_x = counting(&router, vec![s("a"), s("b"), s("x"), s("x.i")]);
    let graph = record_graph(&Calls::default());

    router.publish(&Record::new("a", "b").with_x(), &graph).unwrap();
    assert_eq!((via_w.load(Ordering::SeqCst), via_x.load(Ordering::SeqCst)), (0, 1));

    router.publish(&Record::new("a", "b").with_w().with_x(), &graph).unwrap();
    assert_eq!((via_w.load(Ordering::SeqCst), via_x.load(Ordering::SeqCst)), (1, 2));
}

#[test]
fn unmatched_branches_never_run_their_continuations() {
    let router = Router::new();
    counting(&router, vec![s("a"), s("b"), s("x"), s("x.i"), s("x.j")]);
    let calls = Calls::default();
    let graph = record_graph(&calls);

    let report = router
        .publish(&Record::new("a", "b").with_w().with_x(), &graph)
        .unwrap();
    assert_eq!(report.delivered, 1);

    // "w" is reached through the literal "b" key but emits a key nobody
    // subscribed to, so its children never run.
    assert_eq!(calls.get("w"), 1);
    assert_eq!(calls.get("w.i"), 0);
    assert_eq!(calls.get("w.j"), 0);
    assert_eq!(calls.get("x.i"), 1);
    assert_eq!(calls.get("x.j"), 1);
    assert!(report.pruned > 0);
}

#[test]
fn shallow_subscription_stops_the_walk_early() {
    let router = Router::new();
    let hits = counting(&router, vec![s("a")]);
    let calls = Calls::default();
    let graph = record_graph(&calls);

    let report = router
        .publish(&Record::new("a", "b").with_w().with_x(), &graph)
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(report.traverser_calls, 1);
    assert_eq!(calls.get("a"), 1);
    assert_eq!(calls.get("b"), 0);
}

#[test]
fn callbacks_on_one_path_fire_in_registration_order() {
    let router = Router::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let log = Arc::clone(&log);
        router
            .subscribe_fn(path(vec![s("a"), s("b")]), move |_: &Record| {
                log.lock().unwrap().push(name);
            })
            .unwrap();
    }

    router
        .publish(&Record::new("a", "b"), &record_graph(&Calls::default()))
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn subscribers_receive_the_whole_value() {
    let router = Router::new();
    let stream = router
        .subscribe_channel(path(vec![U, U, s("x"), s("x.i")]))
        .unwrap();

    router
        .publish(&Record::new("a", "b").with_x(), &record_graph(&Calls::default()))
        .unwrap();

    let got = stream.try_recv().unwrap();
    assert_eq!(got.a, "a");
    assert_eq!(got.x.unwrap().j, "x.j");
    assert!(stream.try_recv().is_none());
}

#[test]
fn subscription_paths_can_be_declared_in_json() {
    let router = Router::new();
    let declared: Vec<Path> =
        serde_json::from_str(r#"[[null, "b", "x"], ["a", null, "w"]]"#).unwrap();
    let hits: Vec<_> = declared
        .into_iter()
        .map(|p| counting(&router, p.keys().to_vec()))
        .collect();

    router
        .publish(&Record::new("a", "b").with_x(), &record_graph(&Calls::default()))
        .unwrap();
    assert_eq!(counts(&hits), vec![1, 0]);
}
