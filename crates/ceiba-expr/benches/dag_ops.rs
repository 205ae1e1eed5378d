use ceiba_core::schema::{DataType, Field};
use ceiba_expr::ExprDag;
use ceiba_funcs as funcs;
use criterion::{criterion_group, criterion_main, Criterion};

const DEPTH: usize = 512;

/// A deep left-leaning chain of additions over one input.
fn build_chain(depth: usize) -> ExprDag {
    let mut dag = ExprDag::from_fields(&[Field::new("x", DataType::Int64)]);
    let plus = funcs::plus();
    let mut prev = "x".to_string();
    for i in 0..depth {
        let name = format!("s{}", i);
        dag.add_function(&plus, &[prev.as_str(), "x"], Some(name.clone()))
            .unwrap();
        prev = name;
    }
    dag.prune_to_names(&[prev]).unwrap();
    dag
}

fn bench_dag_ops(c: &mut Criterion) {
    let dag = build_chain(DEPTH);
    let filter = format!("s{}", DEPTH - 1);

    c.bench_function("clone_chain", |b| b.iter(|| dag.clone()));

    c.bench_function("prune_chain", |b| {
        b.iter(|| {
            let mut copy = dag.clone();
            copy.prune();
            copy
        })
    });

    c.bench_function("split_merge_chain", |b| {
        b.iter(|| {
            let (first, second) = dag.split_for_filter(&filter).unwrap();
            ExprDag::merge(first, second).unwrap()
        })
    });

    c.bench_function("dump_chain", |b| b.iter(|| dag.dump()));
}

criterion_group!(benches, bench_dag_ops);
criterion_main!(benches);
