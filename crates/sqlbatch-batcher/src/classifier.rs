//! Batchability classification
//!
//! Decides from a statement's text whether it can be merged with others, and
//! if so hands back the parsed clause the rewriters work from. The shapes
//! are the only input the rewriters accept, so a statement the classifier
//! did not approve can never reach a rewriter.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use sqlbatch_core::StatementKind;

use crate::tokenizer::{
    contains_keyword, contains_line_comment, find_keyword, is_placeholder, matching_paren, split_top_level,
    strip_terminator,
};

// Plain, qualified or double-quoted column reference
static COLUMN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+")(?:\.(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+"))*$"#)
        .expect("valid regex")
});

// Right-hand side of a supported WHERE predicate: a placeholder or a
// single scalar literal
static PREDICATE_LITERAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:'(?:[^']|'')*'|-?[0-9]+(?:\.[0-9]+)?|true|false)$").expect("valid regex")
});

/// A single-row INSERT ... VALUES (...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertShape {
    /// Statement text up to and including `VALUES (`, e.g.
    /// `INSERT INTO t(a,b) VALUES (`
    pub preamble: String,
    /// Trimmed value expressions of the tuple, in column order
    pub values: Vec<String>,
}

/// `column = value` inside a SET list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub column: String,
    pub value: String,
}

/// An UPDATE with a SET list and exactly one `column = value` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedUpdateShape {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub predicate_column: String,
    /// Placeholder or scalar literal compared against `predicate_column`
    pub predicate_value: String,
}

/// Why a statement is executed on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotBatchableReason {
    /// Neither INSERT nor UPDATE
    UnsupportedStatement,
    /// A `--` comment would swallow the rest of a rewritten statement
    LineComment,
    /// INSERT without a VALUES clause (e.g. INSERT ... SELECT)
    MissingValues,
    /// The VALUES tuple is empty, unbalanced or holds an empty value
    MalformedValues,
    /// Text after the value tuple: more rows, RETURNING, ON CONFLICT, ...
    TrailingClause,
    MissingSet,
    /// An unconditional UPDATE is never merged
    MissingWhere,
    /// UPDATE ... FROM or another clause between SET and WHERE
    UnsupportedSetClause,
    /// WHERE combines predicates with AND/OR
    CompoundPredicate,
    /// WHERE holds something other than `column = value`
    UnsupportedPredicate,
    /// The caller's expectation does not allow batching
    ExpectationForbidsBatching,
    /// UPDATE merging is switched off in the options
    UpdatesNotMerged,
}

impl fmt::Display for NotBatchableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NotBatchableReason::UnsupportedStatement => "not an INSERT or UPDATE",
            NotBatchableReason::LineComment => "line comment in statement",
            NotBatchableReason::MissingValues => "INSERT without VALUES",
            NotBatchableReason::MalformedValues => "malformed VALUES tuple",
            NotBatchableReason::TrailingClause => "clause after the VALUES tuple",
            NotBatchableReason::MissingSet => "UPDATE without SET",
            NotBatchableReason::MissingWhere => "UPDATE without WHERE",
            NotBatchableReason::UnsupportedSetClause => "unsupported SET clause",
            NotBatchableReason::CompoundPredicate => "WHERE with AND/OR",
            NotBatchableReason::UnsupportedPredicate => "WHERE is not `column = value`",
            NotBatchableReason::ExpectationForbidsBatching => "expectation forbids batching",
            NotBatchableReason::UpdatesNotMerged => "UPDATE merging disabled",
        };
        f.write_str(text)
    }
}

/// Result of classifying one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementShape {
    Insert(InsertShape),
    Update(SupportedUpdateShape),
    NotBatchable(NotBatchableReason),
}

impl StatementShape {
    pub fn is_batchable(&self) -> bool {
        !matches!(self, StatementShape::NotBatchable(_))
    }
}

/// Whether a statement can be merged into a batch
pub fn is_batchable(sql: &str) -> bool {
    classify(sql).is_batchable()
}

/// Classify a statement by its text shape
pub fn classify(sql: &str) -> StatementShape {
    let sql = sql.trim();
    let result = match StatementKind::detect(sql) {
        StatementKind::Other => Err(NotBatchableReason::UnsupportedStatement),
        _ if contains_line_comment(sql) => Err(NotBatchableReason::LineComment),
        StatementKind::Insert => classify_insert(sql).map(StatementShape::Insert),
        StatementKind::Update => classify_update(sql).map(StatementShape::Update),
    };
    result.unwrap_or_else(StatementShape::NotBatchable)
}

fn classify_insert(sql: &str) -> Result<InsertShape, NotBatchableReason> {
    let values_at = find_keyword(sql, "VALUES").ok_or(NotBatchableReason::MissingValues)?;
    let after_keyword = values_at + "VALUES".len();
    let open = sql[after_keyword..]
        .find(|c: char| !c.is_whitespace())
        .map(|offset| after_keyword + offset)
        .filter(|&idx| sql[idx..].starts_with('('))
        .ok_or(NotBatchableReason::MalformedValues)?;
    let close = matching_paren(sql, open).ok_or(NotBatchableReason::MalformedValues)?;

    if !strip_terminator(&sql[close + 1..]).is_empty() {
        return Err(NotBatchableReason::TrailingClause);
    }

    let values: Vec<String> = split_top_level(&sql[open + 1..close], ',')
        .into_iter()
        .map(|value| value.trim().to_string())
        .collect();
    if values.iter().any(String::is_empty) {
        return Err(NotBatchableReason::MalformedValues);
    }

    Ok(InsertShape {
        preamble: format!("{} VALUES (", sql[..values_at].trim_end()),
        values,
    })
}

fn classify_update(sql: &str) -> Result<SupportedUpdateShape, NotBatchableReason> {
    let set_at = find_keyword(sql, "SET").ok_or(NotBatchableReason::MissingSet)?;
    let where_at = find_keyword(sql, "WHERE").ok_or(NotBatchableReason::MissingWhere)?;
    if where_at < set_at {
        return Err(NotBatchableReason::MissingSet);
    }

    let table = sql["UPDATE".len()..set_at].trim();
    if table.is_empty() {
        return Err(NotBatchableReason::UnsupportedSetClause);
    }

    let set_body = &sql[set_at + "SET".len()..where_at];
    if find_keyword(set_body, "FROM").is_some() {
        return Err(NotBatchableReason::UnsupportedSetClause);
    }
    let assignments = split_top_level(set_body, ',')
        .into_iter()
        .map(parse_assignment)
        .collect::<Option<Vec<_>>>()
        .ok_or(NotBatchableReason::UnsupportedSetClause)?;

    let predicate = strip_terminator(&sql[where_at + "WHERE".len()..]).trim();
    if contains_keyword(predicate, "AND") || contains_keyword(predicate, "OR") {
        return Err(NotBatchableReason::CompoundPredicate);
    }
    let (predicate_column, predicate_value) = match split_top_level(predicate, '=').as_slice() {
        [column, value] => (column.trim(), value.trim()),
        _ => return Err(NotBatchableReason::UnsupportedPredicate),
    };
    let value_supported =
        is_placeholder(predicate_value) || PREDICATE_LITERAL_REGEX.is_match(predicate_value);
    if !COLUMN_REGEX.is_match(predicate_column) || !value_supported {
        return Err(NotBatchableReason::UnsupportedPredicate);
    }

    Ok(SupportedUpdateShape {
        table: table.to_string(),
        assignments,
        predicate_column: predicate_column.to_string(),
        predicate_value: predicate_value.to_string(),
    })
}

fn parse_assignment(pair: &str) -> Option<Assignment> {
    match split_top_level(pair, '=').as_slice() {
        [column, value] => {
            let column = column.trim();
            let value = value.trim();
            (COLUMN_REGEX.is_match(column) && !value.is_empty()).then(|| Assignment {
                column: column.to_string(),
                value: value.to_string(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests;
