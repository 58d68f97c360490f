use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use rulechain_rules::ir::expr::{BinaryOp, Expr};
use rulechain_rules::{
    CompiledRule, ExecutionEngine, ExprPredicate, NoopObserver, Predicate, RuleId, RuleRegistry,
    Value,
};

fn test_record() -> Value {
    Value::from_json(serde_json::json!({
        "color": "red",
        "size": 7,
        "owner": {"name": "ada"}
    }))
}

fn color_is(color: &str) -> Arc<dyn Predicate> {
    // obj.color == <color>
    Arc::new(ExprPredicate::new(
        Expr::Binary(
            BinaryOp::Eq,
            Box::new(Expr::Field(
                Box::new(Expr::Ident("obj".into())),
                "color".into(),
            )),
            Box::new(Expr::String(color.into())),
        ),
        "obj",
    ))
}

fn size_over(limit: i64) -> Arc<dyn Predicate> {
    // obj.size > <limit> && obj.owner.name != null
    Arc::new(ExprPredicate::new(
        Expr::Binary(
            BinaryOp::And,
            Box::new(Expr::Binary(
                BinaryOp::Gt,
                Box::new(Expr::Field(
                    Box::new(Expr::Ident("obj".into())),
                    "size".into(),
                )),
                Box::new(Expr::Int(limit)),
            )),
            Box::new(Expr::Binary(
                BinaryOp::Ne,
                Box::new(Expr::Field(
                    Box::new(Expr::Field(
                        Box::new(Expr::Ident("obj".into())),
                        "owner".into(),
                    )),
                    "name".into(),
                )),
                Box::new(Expr::Null),
            )),
        ),
        "obj",
    ))
}

/// A chain of `len` rules where every predicate holds and points to the next.
fn chain(len: i64) -> ExecutionEngine {
    let rules = (1..=len).map(|id| {
        let predicate = if id % 2 == 0 { color_is("red") } else { size_over(3) };
        CompiledRule::new(id, format!("rule {id}"), predicate).on_true(id + 1)
    });
    ExecutionEngine::new(Arc::new(RuleRegistry::from_rules(rules)))
        .with_observer(Arc::new(NoopObserver))
}

fn bench_linear_chain(c: &mut Criterion) {
    let record = test_record();
    let entry = RuleId::from(1);
    let mut group = c.benchmark_group("traverse_linear_chain");
    for len in [5_i64, 50, 500] {
        let engine = chain(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(engine.run(black_box(&entry), black_box(&record))));
        });
    }
    group.finish();
}

fn bench_cycle_closure(c: &mut Criterion) {
    let record = test_record();
    let entry = RuleId::from(1);
    let engine = ExecutionEngine::new(Arc::new(RuleRegistry::from_rules(vec![
        CompiledRule::new(1, "one", color_is("red")).on_true(2),
        CompiledRule::new(2, "two", size_over(3)).on_true(3),
        CompiledRule::new(3, "three", color_is("red")).on_true(1),
    ])))
    .with_observer(Arc::new(NoopObserver));

    c.bench_function("traverse_three_rule_cycle", |b| {
        b.iter(|| black_box(engine.run(black_box(&entry), black_box(&record))));
    });
}

criterion_group!(benches, bench_linear_chain, bench_cycle_closure);
criterion_main!(benches);
