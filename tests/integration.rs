//! Black-box integration tests for awkql
//!
//! These tests exercise the full parse → analyze → emit pipeline through
//! the public API and check the emitted program text. Behavior under a
//! real awk is covered by tests/awk_exec.rs.

use awkql::{AnalyzeError, DataType, Dialect, Error, Schema, Translation, runtime, translate};

fn schema() -> Schema {
    Schema::parse_header("#db\tsrc:str\tdst:str\tbytes:int\tdur:real").unwrap()
}

fn run(query: &str) -> Translation {
    translate(query, &schema(), Dialect::Portable).unwrap()
}

fn run_err(query: &str) -> Error {
    translate(query, &schema(), Dialect::Portable).unwrap_err()
}

fn output_names(t: &Translation) -> Vec<String> {
    t.output_schema.iter().map(|(n, _)| n.to_string()).collect()
}

// ============ Projections and output schema ============

#[test]
fn simple_projection() {
    let t = run("SELECT src, bytes");
    assert_eq!(output_names(&t), ["src", "bytes"]);
    assert!(t.program.contains("record = $1 \"\\t\" $3;"));
    assert!(!t.program.contains("END {"));
}

#[test]
fn star_projects_all_columns_in_order() {
    let t = run("SELECT *");
    assert_eq!(t.output_schema.header_line(), schema().header_line());
    assert!(t.program.contains("record = $1 \"\\t\" $2 \"\\t\" $3 \"\\t\" $4;"));
}

#[test]
fn aliases_and_types_flow_into_output_schema() {
    let t = run("SELECT bytes * 8 as bits, bytes / 2 as half, src || dst as pair");
    let columns: Vec<(String, DataType)> = t
        .output_schema
        .iter()
        .map(|(n, d)| (n.to_string(), d))
        .collect();
    assert_eq!(
        columns,
        [
            ("bits".to_string(), DataType::Int),
            ("half".to_string(), DataType::Real),
            ("pair".to_string(), DataType::Str),
        ]
    );
}

#[test]
fn output_schema_closure() {
    // every projection name exactly once, in projection order
    let t = run("SELECT dur, src, bytes as b, count(*)");
    assert_eq!(output_names(&t), ["dur", "src", "b", "count"]);
}

#[test]
fn select_keyword_is_optional() {
    assert_eq!(run("src, dst").program, run("SELECT src, dst").program);
}

#[test]
fn bare_where_and_limit_project_star() {
    let t = run("where bytes > 100");
    assert_eq!(t.output_schema.len(), 4);
    assert!(t.program.contains("if (($3 > 100))"));

    let t = run("limit 1");
    assert_eq!(t.output_schema.len(), 4);
    assert!(t.program.contains("if (records >= 1)"));
}

// ============ Filters ============

#[test]
fn where_wraps_the_main_block() {
    let t = run("SELECT src WHERE bytes > 100 AND dur < 1.5");
    assert!(
        t.program.contains("if ((($3 > 100) && ($4 < 1.5)))"),
        "unexpected filter:\n{}",
        t.program
    );
}

#[test]
fn like_translates_to_runtime_regex_match() {
    let t = run("SELECT src WHERE src LIKE 'a%'");
    assert!(t.program.contains("($1 ~ like2regex(\"a%\"))"));

    let t = run("SELECT src WHERE src NOT LIKE '%.gov'");
    assert!(t.program.contains("($1 !~ like2regex(\"%.gov\"))"));
}

#[test]
fn regex_literals_pass_through() {
    let t = run("SELECT src WHERE src ~ /^10\\./");
    assert!(t.program.contains("($1 ~ /^10\\./)"));
}

#[test]
fn cidr_predicate() {
    let t = run("SELECT src WHERE ip_in_cidr(src, '10.0.0.0/8') = 1");
    assert!(t.program.contains("(ip_in_cidr($1, \"10.0.0.0/8\") == 1)"));
}

// ============ DISTINCT and LIMIT ============

#[test]
fn distinct_gates_on_first_seen() {
    let t = run("SELECT DISTINCT src, dst");
    assert!(t.program.contains("if (!(record in distinct))"));
    assert!(t.program.contains("distinct[record] = 1;"));
}

#[test]
fn limit_exits_after_n_records() {
    let t = run("SELECT src LIMIT 3");
    assert!(t.program.contains("records += 1;"));
    assert!(t.program.contains("if (records >= 3)"));
    assert!(t.program.contains("exit;"));
}

// ============ Aggregates ============

#[test]
fn aggregate_query_gets_an_end_block() {
    let t = run("SELECT src, count(*)");
    assert!(t.program.contains("END {"));
    assert!(t.program.contains("partitions[part] = 1;"));
}

#[test]
fn aggregate_classification_matches_projections() {
    // has END block iff some projection is aggregate
    for (query, aggregate) in [
        ("SELECT src, dst", false),
        ("SELECT count(*)", true),
        ("SELECT src WHERE bytes > 0 LIMIT 5", false),
        ("SELECT int(avg(bytes)) as mean", true),
        ("SELECT bytes + 0 as b", false),
    ] {
        let t = run(query);
        assert_eq!(
            t.program.contains("END {"),
            aggregate,
            "misclassified: {query}"
        );
    }
}

#[test]
fn empty_filter_still_prints_one_row() {
    let t = run("SELECT count(*) WHERE bytes > 10000");
    assert!(t.program.contains("if (!matched)"));
    assert!(t.program.contains("partitions[\"\"] = 1;"));
}

#[test]
fn aggregates_group_by_non_aggregate_projections() {
    let t = run("SELECT src, dst, sum(bytes)");
    assert!(t.program.contains("part = $1 \"\\t\" $2;"));
    assert!(t.program.contains("split(part, part_vals, \"\\t\");"));
    assert!(t.program.contains("print part_vals[1];"));
    assert!(t.program.contains("print part_vals[2];"));
}

#[test]
fn total_is_a_sum_with_its_own_name() {
    let t = run("SELECT total(bytes)");
    assert_eq!(output_names(&t), ["total"]);
    assert!(t.program.contains("agg_0[part, \"sum\"] += $3;"));
}

#[test]
fn distinct_aggregate_uses_a_set_slot() {
    let t = run("SELECT sum(DISTINCT bytes)");
    assert!(t.program.contains("if (!((part, \"set\", $3) in agg_0))"));
    assert!(t.program.contains("agg_0[part, \"set\", $3] = 1;"));
}

#[test]
fn every_aggregate_gets_its_own_state_array() {
    let t = run("SELECT count(*) as a, count(*) as b, max(dur) as c");
    for array in ["agg_0", "agg_1", "agg_2"] {
        assert!(t.program.contains(array), "missing {array}");
    }
}

// ============ Dialects ============

#[test]
fn gawk_only_functions_are_gated() {
    let gawk_only = [
        "atan2", "cos", "exp", "log", "rand", "sin", "sqrt", "strftime", "submatch",
    ];
    for name in gawk_only {
        let query = format!("SELECT {name}(bytes) as x");
        match translate(&query, &schema(), Dialect::Portable) {
            Err(Error::Analyze(AnalyzeError::UnknownFunction(f))) => assert_eq!(f, name),
            other => panic!("portable should reject {name}: {other:?}"),
        }
        assert!(
            translate(&query, &schema(), Dialect::Gawk).is_ok(),
            "gawk should accept {name}"
        );
    }
}

#[test]
fn portable_functions_work_in_both_dialects() {
    for dialect in [Dialect::Portable, Dialect::Gawk] {
        assert!(translate("SELECT trim(src, 'x') as t", &schema(), dialect).is_ok());
    }
}

#[test]
fn gawk_programs_embed_the_gawk_helpers() {
    let t = translate("SELECT src", &schema(), Dialect::Gawk).unwrap();
    assert!(t.program.contains("function submatch("));
    assert!(!run("SELECT src").program.contains("function submatch("));
}

// ============ Runtime ABI ============

#[test]
fn every_program_carries_the_runtime_library() {
    for query in ["SELECT src", "SELECT count(*)", "where bytes > 0"] {
        let t = run(query);
        for name in runtime::PORTABLE_FUNCTIONS {
            assert!(
                t.program.contains(&format!("function {name}(")),
                "{query}: missing runtime function {name}"
            );
        }
    }
}

#[test]
fn prologue_sets_tab_fs() {
    assert!(
        run("SELECT src")
            .program
            .starts_with("BEGIN { FS = \"\\t\"; records = 0; }")
    );
}

// ============ Errors ============

#[test]
fn syntax_errors_carry_an_offset() {
    let Error::Parse(err) = run_err("SELECT src WHERE >") else {
        panic!("expected a parse error");
    };
    assert!(err.offset > 0);
    assert_eq!(err.line, 1);
}

#[test]
fn semantic_errors() {
    assert!(matches!(
        run_err("SELECT nope"),
        Error::Analyze(AnalyzeError::UnknownColumn(name)) if name == "nope"
    ));
    assert!(matches!(
        run_err("SELECT reverse(src)"),
        Error::Analyze(AnalyzeError::UnknownFunction(name)) if name == "reverse"
    ));
    assert!(matches!(
        run_err("SELECT src LIMIT 0"),
        Error::Analyze(AnalyzeError::BadLimit(_))
    ));
    assert!(matches!(
        run_err("SELECT src, dst as src"),
        Error::Analyze(AnalyzeError::DuplicateProjection(name)) if name == "src"
    ));
    assert!(matches!(
        run_err("SELECT src WHERE count(*) > 0"),
        Error::Analyze(AnalyzeError::AggregateInWhere)
    ));
    assert!(matches!(
        run_err("SELECT max(min(bytes))"),
        Error::Analyze(AnalyzeError::NestedAggregate)
    ));
    assert!(matches!(
        run_err("SELECT bytes + *"),
        Error::Analyze(AnalyzeError::TypeError(_))
    ));
}

// ============ Parsing invariants ============

#[test]
fn parsing_is_idempotent() {
    use awkql::advanced::parse;
    for query in [
        "SELECT src, count(DISTINCT dst) WHERE bytes > 0 LIMIT 5",
        "distinct src, dst || ':' || src as pair where src like '10.%'",
        "where ip_in_cidr(src, '10.0.0.0/8') = 1",
        "SELECT -bytes ^ 2 as v",
    ] {
        let a = parse(query, Dialect::Portable).unwrap();
        let b = parse(query, Dialect::Portable).unwrap();
        assert_eq!(a, b, "parsing {query:?} twice should agree");
    }
}

#[test]
fn precedence_table_groups_tighter_operators_first() {
    use awkql::advanced::{BinOp, Expr, parse};

    // one operator per precedence level, loosest first
    let levels: &[(&str, BinOp)] = &[
        ("or", BinOp::Or),
        ("and", BinOp::And),
        ("like", BinOp::Like),
        ("not like", BinOp::NotLike),
        ("~", BinOp::Match),
        ("=", BinOp::Eq),
        ("<", BinOp::Lt),
        ("+", BinOp::Add),
        ("*", BinOp::Mul),
        ("||", BinOp::Concat),
        ("^", BinOp::Pow),
    ];

    for (i, (low_text, low_op)) in levels.iter().enumerate() {
        for (high_text, high_op) in &levels[i + 1..] {
            // a LOW b HIGH c must group as a LOW (b HIGH c)
            let query = format!("select a {low_text} b {high_text} c");
            let parsed = parse(&query, Dialect::Portable).unwrap();
            let Expr::Binary { first, rest } = &parsed.projections[0].expr else {
                panic!("{query}: expected a binary chain");
            };
            assert_eq!(**first, Expr::Column("a".to_string()), "{query}");
            assert_eq!(rest.len(), 1, "{query}");
            assert_eq!(rest[0].0, *low_op, "{query}");
            let Expr::Binary { rest: inner, .. } = &rest[0].1 else {
                panic!("{query}: tighter operator should group on the right");
            };
            assert_eq!(inner[0].0, *high_op, "{query}");
        }
    }
}
