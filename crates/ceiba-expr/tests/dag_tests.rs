//! Integration tests for the expression-action DAG.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ceiba_core::error::Error;
use ceiba_core::schema::{ColumnWithType, DataType};
use ceiba_core::types::{Column, Scalar};
use ceiba_expr::{ColumnMatchMode, ExprDag, ExpressionCompiler, NodeKind};
use ceiba_funcs as funcs;

fn int32_literal(name: &str, v: i32) -> ColumnWithType {
    ColumnWithType::with_column(name, DataType::Int32, Column::constant(Scalar::I32(v)))
}

// -------------------------------------------------------------------------
// builder surface

#[test]
fn test_constant_fold_plus() {
    let mut dag = ExprDag::new();
    dag.add_column(int32_literal("one", 1)).unwrap();
    dag.add_column(int32_literal("two", 2)).unwrap();
    let plus = funcs::plus();
    let sum = dag
        .add_function(&plus, &["one", "two"], Some("sum".into()))
        .unwrap();

    let node = dag.node(sum);
    assert_eq!(node.kind, NodeKind::Function);
    assert_eq!(node.column, Some(Column::constant(Scalar::I32(3))));
    assert_eq!(node.result_type, DataType::Int32);
}

#[test]
fn test_default_result_name_is_synthesized() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    dag.add_input("y", DataType::Int32).unwrap();
    let plus = funcs::plus();
    let id = dag.add_function(&plus, &["x", "y"], None).unwrap();
    assert_eq!(dag.node(id).result_name, "plus(x, y)");
}

#[test]
fn test_duplicate_column_is_rejected() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    let err = dag.add_input("x", DataType::Int32).unwrap_err();
    assert!(matches!(err, Error::DuplicateColumn(_)));
}

#[test]
fn test_array_join_requires_array_argument() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    let err = dag.add_array_join("x", "y").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
}

#[test]
fn test_array_join_unnests_element_type() {
    let mut dag = ExprDag::new();
    dag.add_input("xs", DataType::Array(Box::new(DataType::Int64)))
        .unwrap();
    let v = dag.add_array_join("xs", "x").unwrap();
    let node = dag.node(v);
    assert_eq!(node.kind, NodeKind::ArrayJoin);
    assert_eq!(node.result_type, DataType::Int64);
    assert!(node.column.is_none());
}

#[test]
fn test_unknown_identifier() {
    let mut dag = ExprDag::new();
    let err = dag.add_alias("ghost", "g").unwrap_err();
    assert!(matches!(err, Error::UnknownIdentifier(_)));
}

#[test]
fn test_alias_inherits_constant_and_type() {
    let mut dag = ExprDag::new();
    dag.add_column(int32_literal("c", 5)).unwrap();
    let alias = dag.add_alias("c", "renamed").unwrap();
    let node = dag.node(alias);
    assert_eq!(node.kind, NodeKind::Alias);
    assert_eq!(node.result_type, DataType::Int32);
    assert_eq!(node.column, Some(Column::constant(Scalar::I32(5))));
    assert_eq!(node.children.len(), 1);
}

#[test]
fn test_fold_with_no_arguments_yields_one_row() {
    let mut dag = ExprDag::new();
    let pi = funcs::pi();
    let id = dag.add_function(&pi, &[], Some("pi".into())).unwrap();
    let column = dag.node(id).column.as_ref().expect("pi folds");
    assert!(column.is_const());
    assert_eq!(column.len(), 1);
}

#[test]
fn test_nondeterministic_fold_depends_on_compile_setting() {
    let noise = funcs::noise();

    let mut plain = ExprDag::new();
    plain.add_column(int32_literal("c", 1)).unwrap();
    let folded = plain.add_function(&noise, &["c"], Some("n".into())).unwrap();
    assert!(plain.node(folded).column.is_some());

    let mut compiled = ExprDag::new();
    compiled.settings.compile_expressions = true;
    compiled.add_column(int32_literal("c", 1)).unwrap();
    let kept = compiled
        .add_function(&noise, &["c"], Some("n".into()))
        .unwrap();
    assert!(compiled.node(kept).column.is_none());
}

#[test]
fn test_always_constant_function_marks_soft_constant() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    let ignore = funcs::ignore();
    let id = dag.add_function(&ignore, &["x"], Some("ig".into())).unwrap();

    let node = dag.node(id);
    assert_eq!(node.column, Some(Column::constant(Scalar::Bool(false))));
    assert!(!node.allow_constant_folding);

    // The recorded constant must not let pruning fold the subtree away.
    dag.prune_to_names(&["ig"]).unwrap();
    let node = dag.node(dag.node_id("ig").unwrap());
    assert_eq!(node.kind, NodeKind::Function);
    assert_eq!(node.children.len(), 1);
}

#[test]
fn test_type_name_of_reports_argument_type() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Float64).unwrap();
    let f = funcs::type_name_of();
    let id = dag.add_function(&f, &["x"], Some("t".into())).unwrap();
    assert_eq!(
        dag.node(id).column,
        Some(Column::constant(Scalar::Str("Float64".into())))
    );
}

// -------------------------------------------------------------------------
// structural invariants

#[test]
fn test_node_references_stay_valid_across_builds() {
    let mut dag = ExprDag::new();
    let a = dag.add_input("a", DataType::Int32).unwrap();
    let b = dag.add_input("b", DataType::Int32).unwrap();
    let plus = funcs::plus();
    for i in 0..50 {
        dag.add_function(&plus, &["a", "b"], Some(format!("s{}", i)))
            .unwrap();
    }
    assert_eq!(dag.node(a).result_name, "a");
    assert_eq!(dag.node(b).result_name, "b");
}

#[test]
fn test_children_always_predate_their_node() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_column(int32_literal("c", 3)).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["a", "c"], Some("s".into())).unwrap();
    dag.add_alias("s", "t").unwrap();

    for (id, node) in dag.nodes() {
        for child in &node.children {
            assert!(child.index() < id.index());
        }
    }
}

#[test]
fn test_index_points_at_live_nodes() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["a", "a"], Some("s".into())).unwrap();
    dag.prune_to_names(&["s"]).unwrap();

    let live: HashSet<_> = dag.nodes().map(|(id, _)| id).collect();
    for id in dag.index().ids() {
        assert!(live.contains(&id));
    }
}

// -------------------------------------------------------------------------
// pruning

#[test]
fn test_prune_drops_unreachable_work_and_inputs() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_input("unused", DataType::Int32).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["a", "a"], Some("s".into())).unwrap();
    dag.add_function(&plus, &["unused", "unused"], Some("dead".into()))
        .unwrap();

    dag.prune_to_names(&["s"]).unwrap();

    assert_eq!(dag.names(), ["s"]);
    let required: Vec<_> = dag
        .required_columns()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(required, ["a"]);
}

#[test]
fn test_prune_is_idempotent() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_input("b", DataType::Int32).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["a", "b"], Some("s".into())).unwrap();
    dag.prune_to_names(&["s"]).unwrap();
    let once = dag.dump();
    dag.prune();
    assert_eq!(dag.dump(), once);
}

#[test]
fn test_prune_folds_constant_subtrees() {
    let mut dag = ExprDag::new();
    dag.add_column(int32_literal("one", 1)).unwrap();
    dag.add_column(int32_literal("two", 2)).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["one", "two"], Some("sum".into()))
        .unwrap();

    dag.prune_to_names(&["sum"]).unwrap();

    // The folded function collapsed to a constant column; the literal
    // children became unreachable and were removed.
    let sum = dag.node(dag.node_id("sum").unwrap());
    assert_eq!(sum.kind, NodeKind::Column);
    assert!(sum.children.is_empty());
    assert_eq!(dag.nodes().count(), 1);
}

#[test]
fn test_prune_preserves_array_joins() {
    let mut dag = ExprDag::new();
    dag.add_input("xs", DataType::Array(Box::new(DataType::Int32)))
        .unwrap();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_array_join("xs", "x").unwrap();

    dag.prune_to_names(&["a"]).unwrap();

    // Removing the unnest would change the row count.
    assert!(dag.has_array_join());
    assert_eq!(dag.names(), ["a"]);
}

#[test]
fn test_remove_unused_input() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_input("b", DataType::Int32).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["a", "a"], Some("s".into())).unwrap();

    let err = dag.remove_unused_input("a").unwrap_err();
    assert!(matches!(err, Error::Invariant(_)));
    assert!(matches!(
        dag.remove_unused_input("ghost").unwrap_err(),
        Error::Invariant(_)
    ));

    dag.remove_unused_input("b").unwrap();
    let required: Vec<_> = dag
        .required_columns()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(required, ["a"]);
    assert!(!dag.names().contains(&"b".to_string()));
}

// -------------------------------------------------------------------------
// projection

#[test]
fn test_rename_only_projection_adds_one_alias() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.project(&[("a".into(), Some("b".into()))]).unwrap();

    let aliases = dag
        .nodes()
        .filter(|(_, node)| node.kind == NodeKind::Alias)
        .count();
    assert_eq!(aliases, 1);
    assert_eq!(dag.names(), ["b"]);
    assert!(dag.settings.project_input);
    assert!(dag.settings.projected_output);
}

#[test]
fn test_projection_without_rename_keeps_node() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_input("b", DataType::Int32).unwrap();
    dag.project(&[("b".into(), None)]).unwrap();

    assert_eq!(dag.names(), ["b"]);
    assert_eq!(dag.nodes().count(), 1);
}

#[test]
fn test_try_restore_column_prefers_most_recent() {
    let mut dag = ExprDag::new();
    dag.add_input("xs", DataType::Array(Box::new(DataType::Int32)))
        .unwrap();
    let first = dag.add_array_join("xs", "x").unwrap();
    dag.prune_to_names(&["xs"]).unwrap();
    let second = dag.add_array_join("xs", "x").unwrap();
    dag.prune_to_names(&["xs"]).unwrap();

    // Both unnests survive pruning but neither is exposed.
    assert!(!dag.names().contains(&"x".to_string()));
    assert!(dag.try_restore_column("x"));
    // The reverse scan re-exposes the most recently added node; callers
    // cannot pick the older one.
    assert_eq!(dag.find("x"), Some(second));
    assert_ne!(dag.find("x"), Some(first));

    assert!(!dag.try_restore_column("ghost"));
}

// -------------------------------------------------------------------------
// conversion

#[test]
fn test_convert_identity_builds_inputs_only() {
    let source = vec![
        ColumnWithType::new("a", DataType::Int32),
        ColumnWithType::new("b", DataType::Utf8),
    ];
    let dag =
        ExprDag::make_converting(&source, &source, ColumnMatchMode::Position, false).unwrap();

    assert_eq!(dag.nodes().count(), 2);
    assert!(dag.is_empty());
    assert_eq!(dag.names(), ["a", "b"]);
    assert!(dag.settings.project_input);
}

#[test]
fn test_convert_inserts_cast_by_name() {
    let source = vec![ColumnWithType::new("a", DataType::Int32)];
    let result = vec![ColumnWithType::new("a", DataType::Int64)];
    let dag = ExprDag::make_converting(&source, &result, ColumnMatchMode::Name, false).unwrap();

    let kinds: Vec<_> = dag.nodes().map(|(_, n)| n.kind).collect();
    assert!(kinds.contains(&NodeKind::Input));
    assert!(kinds.contains(&NodeKind::Column)); // the "Int64" type-name constant
    assert!(kinds.contains(&NodeKind::Function)); // the cast
    assert!(kinds.contains(&NodeKind::Alias)); // back to the name "a"

    let results = dag.result_columns();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "a");
    assert_eq!(results[0].data_type, DataType::Int64);

    let type_name = dag
        .nodes()
        .find(|(_, n)| n.kind == NodeKind::Column)
        .map(|(_, n)| n.column.clone())
        .unwrap();
    assert_eq!(
        type_name.and_then(|c| c.const_value().cloned()),
        Some(Scalar::Str("Int64".into()))
    );
}

#[test]
fn test_convert_by_position_checks_cardinality() {
    let source = vec![ColumnWithType::new("a", DataType::Int32)];
    let result = vec![
        ColumnWithType::new("a", DataType::Int32),
        ColumnWithType::new("b", DataType::Int32),
    ];
    let err =
        ExprDag::make_converting(&source, &result, ColumnMatchMode::Position, false).unwrap_err();
    assert!(matches!(err, Error::ColumnCountMismatch { .. }));
}

#[test]
fn test_convert_by_name_missing_column() {
    let source = vec![ColumnWithType::new("a", DataType::Int32)];
    let result = vec![ColumnWithType::new("b", DataType::Int32)];
    let err = ExprDag::make_converting(&source, &result, ColumnMatchMode::Name, false).unwrap_err();
    assert!(matches!(err, Error::NoSuchColumn(_)));
}

#[test]
fn test_convert_duplicate_names_consume_in_order() {
    let source = vec![
        ColumnWithType::new("x", DataType::Int32),
        ColumnWithType::new("x", DataType::Int64),
    ];
    let result = vec![
        ColumnWithType::new("x", DataType::Int64),
        ColumnWithType::new("x", DataType::Int64),
    ];
    let dag = ExprDag::make_converting(&source, &result, ColumnMatchMode::Name, false).unwrap();

    let results = dag.result_columns();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.data_type == DataType::Int64));
    // The first result slot consumed the Int32 occurrence, so a cast was
    // needed; the second matched the Int64 occurrence directly.
    assert!(dag.nodes().any(|(_, n)| n.kind == NodeKind::Function));
}

#[test]
fn test_convert_constant_value_mismatch() {
    let source = vec![int32_literal("c", 1)];
    let result = vec![int32_literal("c", 2)];

    let err =
        ExprDag::make_converting(&source, &result, ColumnMatchMode::Position, false).unwrap_err();
    assert!(matches!(err, Error::IllegalColumn(_)));

    // With ignore_constant_values the result constant wins.
    let dag = ExprDag::make_converting(&source, &result, ColumnMatchMode::Position, true).unwrap();
    let results = dag.result_columns();
    assert_eq!(
        results[0].column.as_ref().and_then(|c| c.const_value()),
        Some(&Scalar::I32(2))
    );
}

#[test]
fn test_convert_nonconst_source_for_const_result() {
    let source = vec![ColumnWithType::new("c", DataType::Int32)];
    let result = vec![int32_literal("c", 2)];
    let err =
        ExprDag::make_converting(&source, &result, ColumnMatchMode::Position, false).unwrap_err();
    assert!(matches!(err, Error::IllegalColumn(_)));
}

#[test]
fn test_convert_materializes_constant_into_full_column() {
    let source = vec![int32_literal("c", 7)];
    let result = vec![ColumnWithType::new("c", DataType::Int32)];
    let dag = ExprDag::make_converting(&source, &result, ColumnMatchMode::Position, false).unwrap();

    let materialized = dag.nodes().any(|(_, n)| {
        n.function_base
            .as_ref()
            .is_some_and(|f| f.name() == "materialize")
    });
    assert!(materialized);
    // The exposed column is no longer constant.
    assert!(!dag.result_columns()[0].is_const());
}

// -------------------------------------------------------------------------
// merge

#[test]
fn test_merge_feeds_outputs_into_inputs() {
    let mut first = ExprDag::new();
    first.add_input("p", DataType::Int32).unwrap();
    first.add_input("q", DataType::Int32).unwrap();
    let plus = funcs::plus();
    first
        .add_function(&plus, &["p", "q"], Some("x".into()))
        .unwrap();
    first.add_alias("q", "y").unwrap();
    first.prune_to_names(&["x", "y"]).unwrap();

    let mut second = ExprDag::new();
    second.add_input("x", DataType::Int32).unwrap();
    second
        .add_function(&plus, &["x", "x"], Some("n".into()))
        .unwrap();

    let merged = ExprDag::merge(first, second).unwrap();

    // Second's index first (x is its consumed input re-published, n its
    // new column), then what is left of first's outputs.
    assert_eq!(merged.names(), ["x", "n", "y"]);
    let x = merged.node(merged.node_id("x").unwrap());
    assert_eq!(x.kind, NodeKind::Function); // now the plus(p, q) node
    let required: Vec<_> = merged
        .required_columns()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(required, ["p", "q"]);
}

#[test]
fn test_merge_unmatched_input_becomes_input() {
    let mut first = ExprDag::new();
    first.add_input("a", DataType::Int32).unwrap();
    first.add_alias("a", "x").unwrap();
    first.prune_to_names(&["x"]).unwrap();

    let mut second = ExprDag::new();
    second.add_input("x", DataType::Int32).unwrap();
    second.add_input("extra", DataType::Int32).unwrap();
    let plus = funcs::plus();
    second
        .add_function(&plus, &["x", "extra"], Some("s".into()))
        .unwrap();
    second.prune_to_names(&["s"]).unwrap();

    let merged = ExprDag::merge(first, second).unwrap();
    let required: Vec<_> = merged
        .required_columns()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(required, ["a", "extra"]);
}

#[test]
fn test_merge_strict_boundary_rejects_unmatched_input() {
    let mut first = ExprDag::new();
    first.add_input("a", DataType::Int32).unwrap();
    first.project(&[("a".into(), Some("x".into()))]).unwrap();

    let mut second = ExprDag::new();
    second.add_input("x", DataType::Int32).unwrap();
    second.add_input("stranger", DataType::Int32).unwrap();

    let err = ExprDag::merge(first, second).unwrap_err();
    assert!(matches!(err, Error::Invariant(_)));
}

#[test]
fn test_merge_respects_second_projection() {
    let mut first = ExprDag::new();
    first.add_input("a", DataType::Int32).unwrap();
    first.add_alias("a", "x").unwrap();
    first.prune_to_names(&["x"]).unwrap();

    let mut second = ExprDag::new();
    second.add_input("x", DataType::Int32).unwrap();
    second.project(&[("x".into(), Some("out".into()))]).unwrap();

    let merged = ExprDag::merge(first, second).unwrap();
    assert_eq!(merged.names(), ["out"]);
    assert!(merged.settings.project_input);
}

// -------------------------------------------------------------------------
// split

#[test]
fn test_split_for_filter_round_trip() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    dag.add_column(int32_literal("zero", 0)).unwrap();
    let gt = funcs::greater();
    dag.add_function(&gt, &["x", "zero"], Some("y".into()))
        .unwrap();
    dag.prune_to_names(&["y"]).unwrap();
    let original_dump = dag.dump();

    let (first, second) = dag.split_for_filter("y").unwrap();

    assert_eq!(first.names(), ["y"]);
    assert_eq!(second.names(), ["y"]);
    let boundary = second.node(second.node_id("y").unwrap());
    assert_eq!(boundary.kind, NodeKind::Input);
    assert_eq!(boundary.result_type, DataType::Boolean);

    let merged = ExprDag::merge(first, second).unwrap();
    assert_eq!(merged.dump(), original_dump);
}

#[test]
fn test_split_for_filter_missing_column() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    assert!(matches!(
        dag.split_for_filter("ghost").unwrap_err(),
        Error::Invariant(_)
    ));
}

#[test]
fn test_split_duplicates_constants_instead_of_declaring_inputs() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_column(int32_literal("one", 1)).unwrap();
    let plus = funcs::plus();
    // The literal feeds both halves: u lands in first, v in second.
    dag.add_function(&plus, &["a", "one"], Some("u".into()))
        .unwrap();
    dag.add_function(&plus, &["u", "one"], Some("v".into()))
        .unwrap();
    dag.prune_to_names(&["v"]).unwrap();

    let mut split_nodes = HashSet::new();
    split_nodes.insert(dag.node_id("u").unwrap());
    let (first, second) = dag.split(&split_nodes);

    assert_eq!(first.names(), ["u"]);
    // The literal was replicated into the second half rather than turned
    // into a boundary input.
    let second_inputs: Vec<_> = second
        .required_columns()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(second_inputs, ["u"]);
    assert!(second
        .nodes()
        .any(|(_, n)| n.kind == NodeKind::Column && n.result_name == "one"));

    let merged = ExprDag::merge(first, second).unwrap();
    assert_eq!(merged.names(), ["v"]);
}

#[test]
fn test_split_preserves_result_schema_in_second() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    dag.add_input("y", DataType::Int64).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["x", "y"], Some("s".into())).unwrap();
    dag.prune_to_names(&["s", "x"]).unwrap();

    let mut split_nodes = HashSet::new();
    split_nodes.insert(dag.node_id("x").unwrap());
    let (_, second) = dag.split(&split_nodes);

    let schema: Vec<_> = dag
        .names_and_types()
        .into_iter()
        .map(|f| (f.name, f.data_type))
        .collect();
    let second_schema: Vec<_> = second
        .names_and_types()
        .into_iter()
        .map(|f| (f.name, f.data_type))
        .collect();
    assert_eq!(schema, second_schema);
}

#[test]
fn test_split_before_array_join() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    dag.add_input("b", DataType::Array(Box::new(DataType::Int32)))
        .unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["a", "a"], Some("u".into())).unwrap();
    dag.add_array_join("b", "v").unwrap();
    dag.add_function(&plus, &["u", "v"], Some("w".into())).unwrap();
    dag.prune_to_names(&["w"]).unwrap();

    let array_joined: HashSet<String> = ["b".to_string()].into_iter().collect();
    let (first, second) = dag.split_before_array_join(&array_joined);

    // First computes u from a and passes b through untouched.
    assert_eq!(first.names(), ["b", "u"]);
    assert!(!first.has_array_join());
    assert!(!first.settings.project_input);

    // Second unnests b and combines.
    assert!(second.has_array_join());
    let second_inputs: Vec<_> = second
        .required_columns()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(second_inputs, ["b", "u"]);
    assert_eq!(second.names(), ["w"]);

    let merged = ExprDag::merge(first, second).unwrap();
    assert_eq!(merged.names(), ["w"]);
    assert!(merged.has_array_join());
}

// -------------------------------------------------------------------------
// clone, dump, predicates, compile hook

#[test]
fn test_clone_preserves_structure_and_sharing() {
    let mut dag = ExprDag::new();
    dag.add_input("a", DataType::Int32).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["a", "a"], Some("s".into())).unwrap();
    dag.add_alias("s", "t").unwrap();

    let copy = dag.clone();
    assert_eq!(copy.dump(), dag.dump());

    // Mutating the copy leaves the original alone.
    let mut copy = copy;
    copy.prune_to_names(&["t"]).unwrap();
    assert_ne!(copy.names(), dag.names());
}

#[test]
fn test_dump_shape() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    dag.add_column(int32_literal("two", 2)).unwrap();
    let plus = funcs::plus();
    dag.add_function(&plus, &["x", "two"], Some("s".into())).unwrap();

    let dump = dag.dump();
    assert_eq!(
        dump,
        "0 : INPUT () (no column) Int32 x\n\
         1 : COLUMN () Const(size = 1, value = 2) Int32 two\n\
         2 : FUNCTION (0, 1) (no column) Int32 s [plus]\n\
         Index: 0 1 2\n"
    );
}

#[test]
fn test_is_empty_and_stateful_predicates() {
    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    assert!(dag.is_empty());
    assert!(!dag.has_stateful_functions());

    let rc = funcs::running_count();
    dag.add_function(&rc, &["x"], Some("r".into())).unwrap();
    assert!(!dag.is_empty());
    assert!(dag.has_stateful_functions());
}

struct CountingCompiler {
    calls: AtomicUsize,
}

impl ExpressionCompiler for CountingCompiler {
    fn compile(&self, _dag: &mut ExprDag) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        false
    }
}

#[test]
fn test_compile_hook_runs_only_when_enabled() {
    let compiler = Arc::new(CountingCompiler {
        calls: AtomicUsize::new(0),
    });

    let mut dag = ExprDag::new();
    dag.add_input("x", DataType::Int32).unwrap();
    dag.set_compiler(compiler.clone());

    dag.compile_expressions();
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);

    dag.settings.compile_expressions = true;
    dag.compile_expressions();
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_compiler_flows_through_merge() {
    let compiler = Arc::new(CountingCompiler {
        calls: AtomicUsize::new(0),
    });

    let mut first = ExprDag::new();
    first.add_input("a", DataType::Int32).unwrap();
    first.add_alias("a", "x").unwrap();
    first.prune_to_names(&["x"]).unwrap();

    let mut second = ExprDag::new();
    second.add_input("x", DataType::Int32).unwrap();
    second.set_compiler(compiler);

    let merged = ExprDag::merge(first, second).unwrap();
    assert!(merged.compiler().is_some());
}
