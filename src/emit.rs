//! awk program emission
//!
//! Walks the analyzed query and renders a complete program: prologue with
//! the embedded runtime library, a per-record main block, and (for
//! aggregate queries) an END block that replays each partition. Expressions
//! have up to three renderings: the row-context scalar form, the per-record
//! aggregate state update, and the END-block final form where each
//! aggregate call site reads its state array back.

use crate::analyze::Analyzed;
use crate::ast::{AggKind, Aggregate, BinOp, Expr, UnaryOp};
use crate::dialect::Dialect;
use crate::runtime;
use crate::schema::Schema;

pub(crate) fn generate(query: &Analyzed, schema: &Schema, dialect: Dialect) -> String {
    let mut e = Emitter::new();
    e.line("BEGIN { FS = \"\\t\"; records = 0; }");
    e.blank();
    e.raw(runtime::PORTABLE_LIBRARY);
    if dialect == Dialect::Gawk {
        e.blank();
        e.raw(runtime::GAWK_LIBRARY);
    }
    e.blank();
    emit_main(&mut e, query, schema);
    if query.has_aggregate {
        e.blank();
        emit_epilogue(&mut e, query, schema);
    }
    e.finish()
}

// ============ Main block ============

fn emit_main(e: &mut Emitter, query: &Analyzed, schema: &Schema) {
    e.open("{");
    if let Some(filter) = &query.filter {
        e.open(&format!("if ({}) {{", expr_text(filter, schema)));
    }

    if query.has_aggregate {
        emit_aggregate_body(e, query, schema);
    } else {
        emit_scalar_body(e, query, schema);
    }

    if query.filter.is_some() {
        e.close();
    }
    e.close();
}

fn emit_scalar_body(e: &mut Emitter, query: &Analyzed, schema: &Schema) {
    let fields: Vec<String> = query
        .projections
        .iter()
        .map(|p| expr_text(&p.expr, schema))
        .collect();
    e.line(&format!("record = {};", fields.join(" \"\\t\" ")));

    if query.distinct {
        e.open("if (!(record in distinct)) {");
        e.line("distinct[record] = 1;");
        e.line("print record;");
        emit_limit(e, query.limit);
        e.close();
    } else {
        e.line("print record;");
        emit_limit(e, query.limit);
    }
}

fn emit_aggregate_body(e: &mut Emitter, query: &Analyzed, schema: &Schema) {
    let parts: Vec<String> = query
        .projections
        .iter()
        .filter(|p| !p.is_aggregate())
        .map(|p| expr_text(&p.expr, schema))
        .collect();
    if parts.is_empty() {
        e.line("part = \"\";");
    } else {
        e.line(&format!("part = {};", parts.join(" \"\\t\" ")));
    }
    e.line("partitions[part] = 1;");
    e.line("matched = 1;");

    for projection in &query.projections {
        for agg in projection.expr.aggregates() {
            emit_update(e, agg, schema);
        }
    }
}

fn emit_update(e: &mut Emitter, agg: &Aggregate, schema: &Schema) {
    let array = state_array(agg);
    let value = expr_text(&agg.arg, schema);
    if agg.distinct {
        e.open(&format!("if (!((part, \"set\", {value}) in {array})) {{"));
        e.line(&format!("{array}[part, \"set\", {value}] = 1;"));
        emit_update_step(e, agg, &array, &value);
        e.close();
    } else {
        emit_update_step(e, agg, &array, &value);
    }
}

fn emit_update_step(e: &mut Emitter, agg: &Aggregate, array: &str, value: &str) {
    match agg.kind {
        AggKind::Count => e.line(&format!("{array}[part, \"count\"]++;")),
        AggKind::Sum | AggKind::Total => e.line(&format!("{array}[part, \"sum\"] += {value};")),
        AggKind::Avg => {
            e.line(&format!("{array}[part, \"count\"]++;"));
            e.line(&format!("{array}[part, \"sum\"] += {value};"));
        }
        AggKind::Min => emit_extremum(e, array, value, "min", "<"),
        AggKind::Max => emit_extremum(e, array, value, "max", ">"),
    }
}

fn emit_extremum(e: &mut Emitter, array: &str, value: &str, slot: &str, cmp: &str) {
    e.open(&format!("if ({array}[part, \"{slot}\"] == \"\") {{"));
    e.line(&format!("{array}[part, \"{slot}\"] = {value};"));
    e.chain(&format!(
        "}} else if ({value} {cmp} {array}[part, \"{slot}\"]) {{"
    ));
    e.line(&format!("{array}[part, \"{slot}\"] = {value};"));
    e.close();
}

// ============ END block ============

fn emit_epilogue(e: &mut Emitter, query: &Analyzed, schema: &Schema) {
    e.open("END {");
    // no row survived the filter: one empty partition keeps count() at 0
    e.open("if (!matched) {");
    e.line("partitions[\"\"] = 1;");
    e.close();
    e.open("for (part in partitions) {");

    let has_scalars = query.projections.iter().any(|p| !p.is_aggregate());
    if has_scalars {
        e.line("split(part, part_vals, \"\\t\");");
    }

    let mut part_index = 0usize;
    let values: Vec<String> = query
        .projections
        .iter()
        .map(|p| {
            if p.is_aggregate() {
                expr_text(&p.expr, schema)
            } else {
                part_index += 1;
                format!("part_vals[{part_index}]")
            }
        })
        .collect();

    if values.len() > 1 {
        e.line("ORS = \"\\t\";");
        for value in &values[..values.len() - 1] {
            e.line(&format!("print {value};"));
        }
        e.line("ORS = \"\\n\";");
    }
    if let Some(last) = values.last() {
        e.line(&format!("print {last};"));
    }
    emit_limit(e, query.limit);

    e.close();
    e.close();
}

fn emit_limit(e: &mut Emitter, limit: Option<u64>) {
    if let Some(limit) = limit {
        e.line("records += 1;");
        e.open(&format!("if (records >= {limit}) {{"));
        e.line("exit;");
        e.close();
    }
}

// ============ Expression rendering ============

/// Render an expression as an awk value. In row context aggregates cannot
/// appear (analysis rejects them); in the END block each aggregate call
/// site renders as its final form.
fn expr_text(expr: &Expr, schema: &Schema) -> String {
    match expr {
        Expr::Number(text) => text.clone(),
        Expr::Str(payload) => format!("\"{payload}\""),
        Expr::Regex(payload) => format!("/{payload}/"),
        Expr::Column(name) if name == "*" => "$0".to_string(),
        Expr::Column(name) => {
            // resolved during analysis; awk fields are 1-based
            let index = schema.get(name).map(|(index, _)| index).unwrap_or_default();
            format!("${}", index + 1)
        }
        Expr::Unary(op, operand) => {
            let symbol = match op {
                UnaryOp::Plus => "+",
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            };
            let inner = expr_text(operand, schema);
            if matches!(**operand, Expr::Unary(..)) {
                // `--x` would read as a decrement
                format!("{symbol}({inner})")
            } else {
                format!("{symbol}{inner}")
            }
        }
        Expr::Binary { first, rest } => {
            let mut text = String::from("(");
            text.push_str(&expr_text(first, schema));
            for (op, operand) in rest {
                let rhs = expr_text(operand, schema);
                match op {
                    BinOp::Like => text.push_str(&format!(" ~ like2regex({rhs})")),
                    BinOp::NotLike => text.push_str(&format!(" !~ like2regex({rhs})")),
                    // awk concatenates by juxtaposition
                    BinOp::Concat => text.push_str(&format!(" {rhs}")),
                    _ => text.push_str(&format!(" {} {rhs}", awk_op(*op))),
                }
            }
            text.push(')');
            text
        }
        Expr::Call { name, args } => {
            let args: Vec<String> = args.iter().map(|a| expr_text(a, schema)).collect();
            match name.as_str() {
                "lower" => format!("tolower({})", args.join(", ")),
                "upper" => format!("toupper({})", args.join(", ")),
                // the runtime min/max take two arguments; fold longer calls
                "min" | "max" => args
                    .into_iter()
                    .reduce(|acc, arg| format!("{name}({acc}, {arg})"))
                    .unwrap_or_else(|| format!("{name}()")),
                _ => format!("{name}({})", args.join(", ")),
            }
        }
        Expr::Aggregate(agg) => final_text(agg),
    }
}

fn awk_op(op: BinOp) -> &'static str {
    match op {
        BinOp::Or => "||",
        BinOp::And => "&&",
        BinOp::Like | BinOp::Match => "~",
        BinOp::NotLike | BinOp::NotMatch => "!~",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Concat => " ",
        BinOp::Pow => "^",
    }
}

fn state_array(agg: &Aggregate) -> String {
    format!("agg_{}", agg.id)
}

/// The END-block reading of one aggregate's state.
fn final_text(agg: &Aggregate) -> String {
    let array = state_array(agg);
    match agg.kind {
        AggKind::Count => {
            format!("((part, \"count\") in {array} ? {array}[part, \"count\"] : 0)")
        }
        AggKind::Sum | AggKind::Total => format!("{array}[part, \"sum\"]"),
        AggKind::Avg => format!("({array}[part, \"sum\"] / {array}[part, \"count\"])"),
        AggKind::Min => format!("{array}[part, \"min\"]"),
        AggKind::Max => format!("{array}[part, \"max\"]"),
    }
}

// ============ Indented text emission ============

struct Emitter {
    out: String,
    depth: usize,
}

impl Emitter {
    fn new() -> Self {
        Emitter {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Verbatim block, e.g. the runtime library asset.
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        if !text.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, head: &str) {
        self.line(head);
        self.depth += 1;
    }

    /// `} else if (...) {` at the enclosing depth.
    fn chain(&mut self, head: &str) {
        self.depth -= 1;
        self.line(head);
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}
