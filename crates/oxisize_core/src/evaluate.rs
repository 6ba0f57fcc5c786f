//! Confident static evaluation of JavaScript expressions.
//!
//! Only literals and compositions of literals fold: primitives, template
//! literals, array and object literals, conditionals, sequences, and
//! unary/binary/logical operators over foldable operands. The `undefined`,
//! `NaN` and `Infinity` globals fold unless the module declares a binding with
//! the same name. Anything that would require running code (other
//! identifiers, calls, member access, spreads, functions) makes the whole
//! evaluation fail instead of producing a partial value.

use log::trace;
use oxc_ast::ast::*;
use oxc_span::GetSpan;
use oxc_syntax::operator::{BinaryOperator, LogicalOperator, UnaryOperator};
use std::{cmp::Ordering, collections::HashSet};

use crate::error::FixtureError;

/// The value of a statically evaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<StaticValue>),
    /// Properties in source order; a later duplicate overrides an earlier one
    Object(Vec<(String, StaticValue)>),
}

impl StaticValue {
    fn is_truthy(&self) -> bool {
        match self {
            StaticValue::Undefined | StaticValue::Null => false,
            StaticValue::Bool(b) => *b,
            StaticValue::Number(n) => *n != 0.0 && !n.is_nan(),
            StaticValue::String(s) => !s.is_empty(),
            StaticValue::Array(_) | StaticValue::Object(_) => true,
        }
    }

    fn type_of(&self) -> &'static str {
        match self {
            StaticValue::Undefined => "undefined",
            StaticValue::Bool(_) => "boolean",
            StaticValue::Number(_) => "number",
            StaticValue::String(_) => "string",
            StaticValue::Null | StaticValue::Array(_) | StaticValue::Object(_) => "object",
        }
    }

    /// String conversion for primitives, `None` for arrays and objects.
    fn primitive_to_string(&self) -> Option<String> {
        match self {
            StaticValue::Undefined => Some("undefined".to_string()),
            StaticValue::Null => Some("null".to_string()),
            StaticValue::Bool(b) => Some(b.to_string()),
            StaticValue::Number(n) => Some(number_to_string(*n)),
            StaticValue::String(s) => Some(s.clone()),
            StaticValue::Array(_) | StaticValue::Object(_) => None,
        }
    }

    /// Numeric conversion for primitives, `None` for arrays and objects.
    fn to_number(&self) -> Option<f64> {
        match self {
            StaticValue::Undefined => Some(f64::NAN),
            StaticValue::Null => Some(0.0),
            StaticValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            StaticValue::Number(n) => Some(*n),
            StaticValue::String(s) => Some(string_to_number(s)),
            StaticValue::Array(_) | StaticValue::Object(_) => None,
        }
    }

    fn strict_equals(&self, other: &StaticValue) -> bool {
        match (self, other) {
            (StaticValue::Undefined, StaticValue::Undefined) | (StaticValue::Null, StaticValue::Null) => true,
            (StaticValue::Bool(a), StaticValue::Bool(b)) => a == b,
            (StaticValue::Number(a), StaticValue::Number(b)) => a == b,
            (StaticValue::String(a), StaticValue::String(b)) => a == b,
            _ => false,
        }
    }

    /// `==` between primitives.
    fn loose_equals(&self, other: &StaticValue) -> bool {
        use StaticValue::{Null, Undefined};
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            _ if self.type_of() == other.type_of() => self.strict_equals(other),
            _ => self.to_number() == other.to_number(),
        }
    }

    /// The value of an object property, or `None` when the value is not an
    /// object or the property is missing or `undefined`.
    pub fn property(&self, key: &str) -> Option<&StaticValue> {
        let StaticValue::Object(props) = self else {
            return None;
        };
        props
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .filter(|v| **v != StaticValue::Undefined)
    }

    /// Distinct own keys of an object in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        if let StaticValue::Object(props) = self {
            for (key, _) in props {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    match s {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            return digits
                .chars()
                .try_fold(0.0, |acc, c| c.to_digit(radix).map(|d| acc * radix as f64 + d as f64))
                .unwrap_or(f64::NAN);
        }
    }

    // Rust also accepts "inf" and "nan", JavaScript does not
    if s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Evaluates expressions from a single parsed source text.
pub struct StaticEvaluator<'s> {
    source: &'s str,
    bindings: HashSet<String>,
}

impl<'s> StaticEvaluator<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source, bindings: HashSet::new() }
    }

    /// Records the module's top-level bindings, which shadow globals.
    pub fn with_module_bindings(mut self, program: &Program) -> Self {
        for stmt in &program.body {
            match stmt {
                Statement::VariableDeclaration(v) => self.bind_variables(v),
                Statement::FunctionDeclaration(f) => self.bind(f.id.as_ref()),
                Statement::ClassDeclaration(c) => self.bind(c.id.as_ref()),
                Statement::ImportDeclaration(i) => {
                    for specifier in i.specifiers.iter().flatten() {
                        self.bind(Some(specifier.local()));
                    }
                }
                Statement::ExportNamedDeclaration(e) => match &e.declaration {
                    Some(Declaration::VariableDeclaration(v)) => self.bind_variables(v),
                    Some(decl) => self.bind(decl.id()),
                    None => {}
                },
                _ => {}
            }
        }
        trace!("Module declares {} top-level bindings", self.bindings.len());
        self
    }

    fn bind(&mut self, id: Option<&BindingIdentifier>) {
        if let Some(id) = id {
            self.bindings.insert(id.name.to_string());
        }
    }

    fn bind_variables(&mut self, v: &VariableDeclaration) {
        for declarator in &v.declarations {
            for id in declarator.id.get_binding_identifiers() {
                self.bindings.insert(id.name.to_string());
            }
        }
    }

    pub fn evaluate(&self, expr: &Expression) -> Result<StaticValue, FixtureError> {
        trace!("Evaluating expression at offset {}", expr.span().start);
        match expr {
            Expression::NullLiteral(_) => Ok(StaticValue::Null),
            Expression::BooleanLiteral(b) => Ok(StaticValue::Bool(b.value)),
            Expression::NumericLiteral(n) => Ok(StaticValue::Number(n.value)),
            Expression::StringLiteral(s) => Ok(StaticValue::String(s.value.to_string())),
            Expression::Identifier(id) => self.evaluate_global(id),
            Expression::ParenthesizedExpression(p) => self.evaluate(&p.expression),
            Expression::TemplateLiteral(t) => self.evaluate_template(t),
            Expression::ArrayExpression(a) => self.evaluate_array(a),
            Expression::ObjectExpression(o) => self.evaluate_object(o),
            Expression::UnaryExpression(u) => self.evaluate_unary(u),
            Expression::BinaryExpression(b) => self.evaluate_binary(b),
            Expression::LogicalExpression(l) => {
                let left = self.evaluate(&l.left)?;
                let short_circuit = match l.operator {
                    LogicalOperator::And => !left.is_truthy(),
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::Coalesce => {
                        !matches!(left, StaticValue::Null | StaticValue::Undefined)
                    }
                };
                if short_circuit { Ok(left) } else { self.evaluate(&l.right) }
            }
            Expression::ConditionalExpression(c) => {
                if self.evaluate(&c.test)?.is_truthy() {
                    self.evaluate(&c.consequent)
                } else {
                    self.evaluate(&c.alternate)
                }
            }
            Expression::SequenceExpression(s) => {
                let mut last = StaticValue::Undefined;
                for item in &s.expressions {
                    last = self.evaluate(item)?;
                }
                Ok(last)
            }
            other => Err(self.not_confident(describe(other), other.span().start)),
        }
    }

    fn evaluate_global(&self, id: &IdentifierReference) -> Result<StaticValue, FixtureError> {
        let value = match id.name.as_str() {
            "undefined" => StaticValue::Undefined,
            "NaN" => StaticValue::Number(f64::NAN),
            "Infinity" => StaticValue::Number(f64::INFINITY),
            _ => return Err(self.not_confident("identifier reference", id.span.start)),
        };
        if self.bindings.contains(id.name.as_str()) {
            return Err(self.not_confident(
                &format!("identifier reference to shadowed `{}`", id.name),
                id.span.start,
            ));
        }
        Ok(value)
    }

    fn evaluate_template(&self, t: &TemplateLiteral) -> Result<StaticValue, FixtureError> {
        let mut out = String::new();
        for (idx, quasi) in t.quasis.iter().enumerate() {
            let Some(cooked) = &quasi.value.cooked else {
                return Err(self.not_confident("invalid template escape", quasi.span.start));
            };
            out.push_str(cooked.as_str());

            if let Some(expr) = t.expressions.get(idx) {
                let value = self.evaluate(expr)?;
                let Some(s) = value.primitive_to_string() else {
                    return Err(self.not_confident("non-primitive template substitution", expr.span().start));
                };
                out.push_str(&s);
            }
        }
        Ok(StaticValue::String(out))
    }
    fn evaluate_array(&self, a: &ArrayExpression) -> Result<StaticValue, FixtureError> {
        let mut items = Vec::with_capacity(a.elements.len());
        for elem in &a.elements {
            match elem {
                ArrayExpressionElement::SpreadElement(s) => {
                    return Err(self.not_confident("spread element", s.span.start));
                }
                ArrayExpressionElement::Elision(e) => {
                    return Err(self.not_confident("array hole", e.span.start));
                }
                _ => {
                    if let Some(expr) = elem.as_expression() {
                        items.push(self.evaluate(expr)?);
                    }
                }
            }
        }
        Ok(StaticValue::Array(items))
    }

    fn evaluate_object(&self, o: &ObjectExpression) -> Result<StaticValue, FixtureError> {
        let mut props = Vec::with_capacity(o.properties.len());
        for prop in &o.properties {
            let p = match prop {
                ObjectPropertyKind::ObjectProperty(p) => p,
                ObjectPropertyKind::SpreadProperty(s) => {
                    return Err(self.not_confident("object spread", s.span.start));
                }
            };

            if !matches!(p.kind, PropertyKind::Init) || p.method {
                return Err(self.not_confident("accessor or method property", p.span.start));
            }
            if p.shorthand {
                return Err(self.not_confident("shorthand property", p.span.start));
            }

            let key = if p.computed {
                let Some(key_expr) = p.key.as_expression() else {
                    return Err(self.not_confident("computed key", p.key.span().start));
                };
                match self.evaluate(key_expr)?.primitive_to_string() {
                    Some(k) => k,
                    None => return Err(self.not_confident("non-primitive computed key", p.key.span().start)),
                }
            } else {
                match p.key.static_name() {
                    Some(name) => name.to_string(),
                    None => return Err(self.not_confident("property key", p.key.span().start)),
                }
            };

            let value = self.evaluate(&p.value)?;
            props.push((key, value));
        }
        Ok(StaticValue::Object(props))
    }

    fn evaluate_unary(&self, u: &UnaryExpression) -> Result<StaticValue, FixtureError> {
        let arg = self.evaluate(&u.argument)?;
        let value = match (u.operator, arg.to_number()) {
            (UnaryOperator::UnaryNegation, Some(n)) => StaticValue::Number(-n),
            (UnaryOperator::UnaryPlus, Some(n)) => StaticValue::Number(n),
            (UnaryOperator::BitwiseNot, Some(n)) => StaticValue::Number(f64::from(!to_int32(n))),
            (UnaryOperator::LogicalNot, _) => StaticValue::Bool(!arg.is_truthy()),
            (UnaryOperator::Void, _) => StaticValue::Undefined,
            (UnaryOperator::Typeof, _) => StaticValue::String(arg.type_of().to_string()),
            (op, _) => {
                return Err(self.not_confident(
                    &format!("unary `{}` on {}", op.as_str(), arg.type_of()),
                    u.span.start,
                ));
            }
        };
        Ok(value)
    }

    fn evaluate_binary(&self, b: &BinaryExpression) -> Result<StaticValue, FixtureError> {
        let left = self.evaluate(&b.left)?;
        let right = self.evaluate(&b.right)?;

        let (Some(l), Some(r)) = (left.to_number(), right.to_number()) else {
            return Err(self.not_confident(
                &format!(
                    "binary `{}` on {} and {}",
                    b.operator.as_str(),
                    left.type_of(),
                    right.type_of()
                ),
                b.span.start,
            ));
        };

        let value = match b.operator {
            BinaryOperator::Addition => match (left.primitive_to_string(), right.primitive_to_string()) {
                (Some(ls), Some(rs))
                    if matches!(left, StaticValue::String(_)) || matches!(right, StaticValue::String(_)) =>
                {
                    StaticValue::String(ls + &rs)
                }
                _ => StaticValue::Number(l + r),
            },
            BinaryOperator::Subtraction => StaticValue::Number(l - r),
            BinaryOperator::Multiplication => StaticValue::Number(l * r),
            BinaryOperator::Division => StaticValue::Number(l / r),
            BinaryOperator::Remainder => StaticValue::Number(l % r),
            BinaryOperator::Exponential => StaticValue::Number(l.powf(r)),
            BinaryOperator::Equality => StaticValue::Bool(left.loose_equals(&right)),
            BinaryOperator::Inequality => StaticValue::Bool(!left.loose_equals(&right)),
            BinaryOperator::StrictEquality => StaticValue::Bool(left.strict_equals(&right)),
            BinaryOperator::StrictInequality => StaticValue::Bool(!left.strict_equals(&right)),
            BinaryOperator::LessThan => StaticValue::Bool(compare(&left, &right) == Some(Ordering::Less)),
            BinaryOperator::GreaterThan => {
                StaticValue::Bool(compare(&left, &right) == Some(Ordering::Greater))
            }
            BinaryOperator::LessEqualThan => {
                StaticValue::Bool(matches!(compare(&left, &right), Some(Ordering::Less | Ordering::Equal)))
            }
            BinaryOperator::GreaterEqualThan => StaticValue::Bool(matches!(
                compare(&left, &right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOperator::BitwiseAnd => StaticValue::Number(f64::from(to_int32(l) & to_int32(r))),
            BinaryOperator::BitwiseOR => StaticValue::Number(f64::from(to_int32(l) | to_int32(r))),
            BinaryOperator::BitwiseXOR => StaticValue::Number(f64::from(to_int32(l) ^ to_int32(r))),
            BinaryOperator::ShiftLeft => {
                StaticValue::Number(f64::from(to_int32(l).wrapping_shl(to_uint32(r) & 31)))
            }
            BinaryOperator::ShiftRight => {
                StaticValue::Number(f64::from(to_int32(l).wrapping_shr(to_uint32(r) & 31)))
            }
            BinaryOperator::ShiftRightZeroFill => {
                StaticValue::Number(f64::from(to_uint32(l).wrapping_shr(to_uint32(r) & 31)))
            }
            op => {
                return Err(self.not_confident(&format!("binary `{}`", op.as_str()), b.span.start));
            }
        };
        Ok(value)
    }

    fn not_confident(&self, what: &str, offset: u32) -> FixtureError {
        let (line, column) = line_column(self.source, offset as usize);
        FixtureError::MetadataEvaluation(format!("{} at line {}, column {}", what, line, column))
    }
}

/// Relational comparison of two primitives; `None` when either side is `NaN`.
fn compare(left: &StaticValue, right: &StaticValue) -> Option<Ordering> {
    if let (StaticValue::String(l), StaticValue::String(r)) = (left, right) {
        return Some(l.encode_utf16().cmp(r.encode_utf16()));
    }
    left.to_number()?.partial_cmp(&right.to_number()?)
}

fn describe(expr: &Expression) -> &'static str {
    match expr {
        Expression::CallExpression(_) => "function call",
        Expression::NewExpression(_) => "constructor call",
        Expression::StaticMemberExpression(_)
        | Expression::ComputedMemberExpression(_)
        | Expression::PrivateFieldExpression(_) => "member access",
        Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_) => "function",
        Expression::ClassExpression(_) => "class",
        Expression::ImportExpression(_) => "dynamic import",
        Expression::AwaitExpression(_) => "await expression",
        Expression::TaggedTemplateExpression(_) => "tagged template",
        Expression::RegExpLiteral(_) => "regular expression",
        Expression::BigIntLiteral(_) => "bigint literal",
        Expression::AssignmentExpression(_) => "assignment",
        Expression::UpdateExpression(_) => "update expression",
        _ => "expression",
    }
}

/// 1-based line and column for a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.len(), |idx| before.len() - idx - 1) + 1;
    (line, column)
}
