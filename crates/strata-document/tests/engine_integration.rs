#![allow(clippy::unwrap_used)]
//! Integration tests for strata-document.
//!
//! Exercises the engine end to end: navigation, copy-on-write batches,
//! search, flattening and collection pipelines.

use serde_json::json;
use strata_document::document::{
    flatten, search, unflatten, Document, DocumentCollection, DocumentError, Engine, EngineConfig,
    FindOutput, FindReturn, FlatValue, FlattenOptions, Marker, PathKey, Pipeline, Replacement,
    SearchOptions, Step, StringMatchOptions, Target, Token, ValueMatcher, WriteBatch,
};

fn doc(value: serde_json::Value) -> Document {
    Document::from(value)
}

fn key(path: &str) -> PathKey {
    strata_document::document::path::parse(path).unwrap()
}

fn sum(current: &Document) -> strata_document::Result<Document> {
    let items = current
        .as_sequence()
        .ok_or_else(|| DocumentError::Task("expected a sequence".into()))?;
    Ok(items.iter().filter_map(Document::as_i64).sum::<i64>().into())
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_get_and_computed_set() {
    let engine = Engine::default();
    let d = doc(json!({"s": "ABC", "d2": {"l": [1, 2]}}));

    assert_eq!(engine.get(&d, "d2.l[0]").unwrap(), &Document::from(1));

    let updated = engine.set(&d, "d2.l", Replacement::with(sum)).unwrap();
    assert_eq!(updated.to_json(), json!({"s": "ABC", "d2": {"l": 3}}));
    // the source is untouched
    assert_eq!(d.to_json(), json!({"s": "ABC", "d2": {"l": [1, 2]}}));
}

#[test]
fn test_scenario_find_replace_changed_only() {
    let engine = Engine::default();
    let matcher = ValueMatcher::single("BC").unwrap();

    let replaced = engine
        .find_replace(&doc(json!("ABC")), &matcher, &Replacement::from("XY"))
        .unwrap();
    assert_eq!(replaced, Document::from("AXY"));

    let docs: DocumentCollection = vec![doc(json!("ABC")), doc(json!("CDE"))].into_iter().collect();
    let changed = docs.find_replace(matcher, "XY", true).unwrap();
    assert_eq!(changed.into_vec(), vec![Document::from("AXY")]);
}

#[test]
fn test_scenario_find_bool() {
    let engine = Engine::default();
    let matcher = ValueMatcher::single("BC").unwrap();
    let hit = engine.find(&doc(json!({"s": "ABC"})), &matcher, FindReturn::Bool);
    let miss = engine.find(&doc(json!({"s": "CDE"})), &matcher, FindReturn::Bool);
    assert_eq!(hit, FindOutput::Bool(true));
    assert_eq!(miss, FindOutput::Bool(false));
}

#[test]
fn test_scenario_flatten_annotated() {
    let d = doc(json!({"a": {"b": [1, 2]}}));
    let flat = flatten(&d, &FlattenOptions::default().annotate_all(true));

    assert_eq!(flat.len(), 4);
    assert_eq!(flat.get(&key("a")), Some(&FlatValue::Marker(Marker::Mapping)));
    assert_eq!(flat.get(&key("a.b")), Some(&FlatValue::Marker(Marker::Sequence)));
    assert_eq!(flat.get(&key("a.b[0]")), Some(&FlatValue::Value(Document::from(1))));
    assert_eq!(flat.get(&key("a.b[1]")), Some(&FlatValue::Value(Document::from(2))));

    let rebuilt = unflatten(&flat).unwrap();
    assert_eq!(rebuilt, d);
    assert_eq!(rebuilt.to_json(), d.to_json());
}

#[test]
fn test_scenario_uniform_groups() {
    let docs: DocumentCollection = [1, 1, 2]
        .into_iter()
        .enumerate()
        .map(|(i, g)| doc(json!({"g": g, "items": [i]})))
        .collect();
    let merge = |acc: &Document, next: &Document| -> strata_document::Result<Document> {
        let mut items = acc.as_mapping().unwrap()["items"].to_json();
        let extra = next.as_mapping().unwrap()["items"].to_json();
        items.as_array_mut().unwrap().extend(extra.as_array().unwrap().iter().cloned());
        Ok(doc(json!({"g": acc.as_mapping().unwrap()["g"].to_json(), "items": items})))
    };

    let grouped = docs.groupby_reduce(merge, None, "g", true).unwrap();
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[0].to_json(), json!({"g": 1, "items": [0, 1]}));
    assert_eq!(grouped[1].to_json(), json!({"g": 2, "items": [2]}));
}

// ============================================================================
// Matching
// ============================================================================

#[test]
fn test_find_all_negation_truth_table() {
    let candidate = doc(json!("ABC"));
    let options = SearchOptions::default();
    // (pattern, whether it matches "ABC")
    let hit = ("B", true);
    let miss = ("X", false);

    for (t1, m1) in [hit, miss] {
        for (t2, m2) in [hit, miss] {
            for (neg1, neg2) in [(false, false), (true, false), (false, true), (true, true)] {
                let target = |pattern: &str, negate: bool| {
                    let t = Target::from(pattern);
                    if negate {
                        !t
                    } else {
                        t
                    }
                };
                let c1 = m1 != neg1;
                let c2 = m2 != neg2;
                for find_all in [false, true] {
                    let matcher = ValueMatcher::new(
                        vec![target(t1, neg1), target(t2, neg2)],
                        find_all,
                        StringMatchOptions::default(),
                    )
                    .unwrap();
                    let expected = if find_all { c1 && c2 } else { c1 || c2 };
                    let found = search::find(&candidate, &matcher, FindReturn::Bool, &options);
                    assert_eq!(
                        found,
                        FindOutput::Bool(expected),
                        "targets ({}{}, {}{}) find_all={}",
                        if neg1 { "!" } else { "" },
                        t1,
                        if neg2 { "!" } else { "" },
                        t2,
                        find_all
                    );
                }
            }
        }
    }
}

#[test]
fn test_value_targets_compare_by_value() {
    let d = doc(json!({"n": 2, "f": 2.0, "b": true}));
    let values = |target: Target| {
        let matcher = ValueMatcher::single(target).unwrap();
        match search::find(&d, &matcher, FindReturn::Values, &SearchOptions::default()) {
            FindOutput::Values(values) => values.into_keys().map(|k| k.to_string()).collect::<Vec<_>>(),
            other => panic!("unexpected output {:?}", other),
        }
    };
    assert_eq!(values(Target::from(2i64)), vec!["f", "n"]);
    assert_eq!(values(Target::from(true)), vec!["b"]);
}

// ============================================================================
// Failure policy
// ============================================================================

#[test]
fn test_skip_missing_versus_task_failure() {
    let docs: DocumentCollection = vec![doc(json!({"a": [1, 2]})), doc(json!({"b": 0}))].into_iter().collect();

    // a missing path fails the call by default
    let err = docs.apply(&Step::get("a[0]").unwrap()).unwrap_err();
    assert!(err.is_missing_path());

    // with skip_missing the document is excluded instead
    let out = docs.apply(&Step::get("a[0]").unwrap().skip_missing(true)).unwrap();
    assert_eq!(out.into_vec(), vec![Document::from(1)]);

    // a failure raised by the step itself is never absorbed
    let failing = Step::chain(vec![Step::get("a").unwrap(), Step::map(sum)]).skip_missing(true);
    let with_scalar: DocumentCollection = vec![doc(json!({"a": [1]})), doc(json!({"a": "x"}))].into_iter().collect();
    let err = with_scalar.apply(&failing).unwrap_err();
    assert_eq!(err, DocumentError::Task("expected a sequence".into()));
}

#[test]
fn test_skip_missing_from_engine_config() {
    let engine = Engine::new(EngineConfig {
        skip_missing: true,
        ..Default::default()
    })
    .unwrap();
    let docs: DocumentCollection = vec![doc(json!({"k": 1})), doc(json!({}))].into_iter().collect();
    let step = engine.step("get", strata_document::document::StepArgs::new().arg("k")).unwrap();
    let out = engine.apply(&docs, &step).unwrap();
    assert_eq!(out.into_vec(), vec![Document::from(1)]);
}

// ============================================================================
// Copy-on-write
// ============================================================================

#[test]
fn test_batch_copies_prefix_once() {
    let d = doc(json!({"p": {"q": {"r": 1}}, "other": {"deep": [1, 2, 3]}}));
    let mut batch = WriteBatch::new(&d);

    batch.set("p", doc(json!({"q": {"r": 2}}))).unwrap();
    let after_prefix = batch.copies();
    assert_eq!(after_prefix, 1);
    // everything under `p` now belongs to the batch; nothing is copied again
    batch.set("p.q.r", 3).unwrap();
    batch.set("p.q.s", 4).unwrap();
    batch.set("p.q.t", 5).unwrap();
    assert_eq!(batch.copies(), after_prefix);

    let out = batch.finish();
    assert_eq!(out.to_json(), json!({"p": {"q": {"r": 3, "s": 4, "t": 5}}, "other": {"deep": [1, 2, 3]}}));
    // untouched parts keep their identity
    let before = strata_document::document::navigate::get(&d, "other").unwrap();
    let after = strata_document::document::navigate::get(&out, "other").unwrap();
    assert!(before.ptr_eq(after));
    // the source is unchanged
    assert_eq!(d.to_json(), json!({"p": {"q": {"r": 1}}, "other": {"deep": [1, 2, 3]}}));
}

#[test]
fn test_in_place_mutation() {
    let engine = Engine::default();
    let mut d = doc(json!({"a": [1, 2, 3]}));
    engine.set_in_place(&mut d, "a[-1]", 30).unwrap();
    let removed = engine.remove_in_place(&mut d, "a[0]").unwrap();
    assert_eq!(removed, Document::from(1));
    assert_eq!(d.to_json(), json!({"a": [2, 30]}));
}

#[test]
fn test_path_representations_agree() {
    let d = doc(json!({"a": {"b": ["x"]}}));
    let engine = Engine::default();
    let from_str = engine.get(&d, "a.b[0]").unwrap();
    let from_tokens = engine
        .get(&d, vec![Token::from("a"), Token::from("b"), Token::from(0i64)])
        .unwrap();
    assert_eq!(from_str, from_tokens);
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn test_declarative_pipeline_over_collection() {
    let engine = Engine::default();
    let pipeline = engine
        .pipeline(&json!([
            {"filter": ["d.price < 10"]},
            ["rename", "price", "cost"],
            ["reorder", null, ["cost"]],
            {"dump": {}}
        ]))
        .unwrap();
    assert_eq!(pipeline.len(), 4);

    let docs: DocumentCollection = vec![
        doc(json!({"name": "a", "price": 5})),
        doc(json!({"name": "b", "price": 50})),
    ]
    .into_iter()
    .collect();
    let out = engine.apply(&docs, &Step::from(pipeline)).unwrap();
    assert_eq!(out.into_vec(), vec![Document::from(r#"{"cost":5,"name":"a"}"#)]);
}

#[test]
fn test_pipeline_flatten_round_trip_across_documents() {
    let docs: DocumentCollection = vec![
        doc(json!({"a": [1, {"b": null}]})),
        doc(json!([{"x": "y"}, []])),
    ]
    .into_iter()
    .collect();
    let pipeline = Pipeline::from_json(&json!([{"flatten": {"annotate_all": true}}, "unflatten"])).unwrap();
    let out = docs.apply(&pipeline.into_step()).unwrap().into_collection();
    assert_eq!(out, docs);
}
