//! Declaration extraction from JavaScript source.
//!
//! Walks the top-level statements of a parsed program and collects
//! `goog.provide('ns')` / `goog.require('ns')` declarations in source order.
//! A file containing the bootstrap shape `goog = goog || {}` (with or without
//! `var`) is the base module and implicitly provides the root namespace.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, AssignmentOperator, AssignmentTarget, BindingPatternKind, Expression,
    LogicalOperator, Program, Statement,
};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::error::{GraphError, Result};

/// Root namespace established by the base module.
pub const BASE_NAMESPACE: &str = "goog";

/// Declarations extracted from a single source file.
///
/// `provides` and `requires` preserve source order. For the base module,
/// `provides` is exactly `[BASE_NAMESPACE]` regardless of file content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    /// True when the file contains the `goog = goog || {}` bootstrap shape.
    pub is_base: bool,
}

impl Declarations {
    /// A file with no declarations carries no graph information.
    pub fn is_empty(&self) -> bool {
        self.provides.is_empty() && self.requires.is_empty() && !self.is_base
    }
}

/// Extract provide/require declarations from `source`.
///
/// This is a pure function of the source text. Zero declarations is a valid
/// result; only syntactically invalid source produces an error.
///
/// # Errors
///
/// * [`GraphError::Parse`] when the source cannot be parsed at all.
/// * [`GraphError::InvalidBaseModule`] when the base shape coexists with
///   explicit `goog.provide` statements.
pub fn extract(source: &str) -> Result<Declarations> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::default()).parse();

    if !ret.errors.is_empty() {
        return Err(parse_error(source, &ret.errors));
    }

    extract_from_program(&ret.program)
}

fn extract_from_program(program: &Program<'_>) -> Result<Declarations> {
    let mut decl = Declarations::default();

    for stmt in &program.body {
        match stmt {
            Statement::ExpressionStatement(expr_stmt) => {
                match &expr_stmt.expression {
                    Expression::CallExpression(call) => {
                        if let Some((method, namespace)) = match_goog_call(call) {
                            match method {
                                "provide" => decl.provides.push(namespace),
                                "require" => decl.requires.push(namespace),
                                _ => {}
                            }
                        }
                    }
                    // `goog = goog || {};` without a declaration keyword.
                    Expression::AssignmentExpression(assign) => {
                        if assign.operator == AssignmentOperator::Assign
                            && matches!(
                                &assign.left,
                                AssignmentTarget::AssignmentTargetIdentifier(id)
                                    if id.name == BASE_NAMESPACE
                            )
                            && is_self_or_empty_object(&assign.right)
                        {
                            decl.is_base = true;
                        }
                    }
                    _ => {}
                }
            }
            // `var goog = goog || {};`
            Statement::VariableDeclaration(var_decl) => {
                for declarator in &var_decl.declarations {
                    let is_goog = matches!(
                        &declarator.id.kind,
                        BindingPatternKind::BindingIdentifier(id) if id.name == BASE_NAMESPACE
                    );
                    if is_goog
                        && declarator
                            .init
                            .as_ref()
                            .is_some_and(is_self_or_empty_object)
                    {
                        decl.is_base = true;
                    }
                }
            }
            _ => {}
        }
    }

    if decl.is_base {
        if !decl.provides.is_empty() {
            return Err(GraphError::InvalidBaseModule);
        }
        decl.provides = vec![BASE_NAMESPACE.to_string()];
    }

    Ok(decl)
}

/// Match `goog.<method>('literal')` and return the method name and argument.
fn match_goog_call<'a>(
    call: &'a oxc_ast::ast::CallExpression<'_>,
) -> Option<(&'a str, String)> {
    let Expression::StaticMemberExpression(member) = &call.callee else {
        return None;
    };
    let Expression::Identifier(object) = &member.object else {
        return None;
    };
    if object.name != BASE_NAMESPACE {
        return None;
    }
    if call.arguments.len() != 1 {
        return None;
    }
    let Argument::StringLiteral(literal) = &call.arguments[0] else {
        return None;
    };
    Some((member.property.name.as_str(), literal.value.to_string()))
}

/// Match the right-hand side of the base shape: `goog || {}`.
fn is_self_or_empty_object(expr: &Expression<'_>) -> bool {
    let Expression::LogicalExpression(logical) = expr else {
        return false;
    };
    logical.operator == LogicalOperator::Or
        && matches!(&logical.left, Expression::Identifier(id) if id.name == BASE_NAMESPACE)
        && matches!(&logical.right, Expression::ObjectExpression(obj) if obj.properties.is_empty())
}

/// Build a [`GraphError::Parse`] from the first parser diagnostic.
fn parse_error(source: &str, errors: &[oxc_diagnostics::OxcDiagnostic]) -> GraphError {
    let first = &errors[0];
    let offset = first
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map_or(0, |label| label.offset());
    let (line, column) = line_column(source, offset as u32);
    let text = source
        .lines()
        .nth(line.saturating_sub(1) as usize)
        .unwrap_or("")
        .trim()
        .to_string();
    GraphError::Parse {
        line,
        column,
        text,
        message: first.message.to_string(),
    }
}

/// Calculate line and column from byte offset in source text.
///
/// Returns (line, column) where line is 1-indexed and column is 0-indexed.
fn line_column(source: &str, offset: u32) -> (u32, u32) {
    let mut line = 1u32;
    let mut column = 0u32;
    for (i, ch) in source.char_indices() {
        if i as u32 >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (line, column)
}
