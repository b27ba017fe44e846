//! Multi-criterion attribute filters and their compiled predicates.
//!
//! A [`QueryGroup`] is an ordered chain of criteria joined by AND/OR.
//! Compilation validates the group against one dataset's schema; evaluation
//! folds strictly left to right with no operator precedence, so
//! `c1 AND c2 OR c3` means `(c1 AND c2) OR c3`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{AttributeValue, Dataset, Feature, FieldType};

/// Comparison operator of a single criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriterionOp {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl CriterionOp {
    /// Whether this operator applies to fields of the given declared type.
    pub fn supports(self, field_type: FieldType) -> bool {
        match field_type {
            FieldType::Text => matches!(
                self,
                Self::Contains
                    | Self::NotContains
                    | Self::Equals
                    | Self::NotEquals
                    | Self::StartsWith
                    | Self::EndsWith
            ),
            FieldType::Number | FieldType::Date => matches!(
                self,
                Self::Equals
                    | Self::NotEquals
                    | Self::GreaterThan
                    | Self::LessThan
                    | Self::GreaterOrEqual
                    | Self::LessOrEqual
            ),
            FieldType::Boolean => matches!(self, Self::Equals | Self::NotEquals),
        }
    }

    /// The negated operators, which a missing attribute value satisfies.
    fn matches_missing(self) -> bool {
        matches!(self, Self::NotEquals | Self::NotContains)
    }
}

impl FromStr for CriterionOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "not-contains" => Ok(Self::NotContains),
            "equals" | "eq" => Ok(Self::Equals),
            "not-equals" | "ne" => Ok(Self::NotEquals),
            "starts-with" => Ok(Self::StartsWith),
            "ends-with" => Ok(Self::EndsWith),
            "greater-than" | "gt" => Ok(Self::GreaterThan),
            "less-than" | "lt" => Ok(Self::LessThan),
            "greater-or-equal" | "ge" => Ok(Self::GreaterOrEqual),
            "less-or-equal" | "le" => Ok(Self::LessOrEqual),
            other => Err(format!("unknown operator '{other}'")),
        }
    }
}

/// How a criterion chains onto the running result of the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    And,
    Or,
}

/// A single field/operator/value test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub field: String,
    pub op: CriterionOp,
    pub value: AttributeValue,
}

impl Criterion {
    pub fn new(field: &str, op: CriterionOp, value: AttributeValue) -> Self {
        Self {
            field: field.to_string(),
            op,
            value,
        }
    }
}

/// Ordered sequence of criteria chained by AND/OR.
///
/// Each entry's combinator joins it to the *following* entry; the final
/// entry's combinator is always `None`, which the builder maintains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryGroup {
    entries: Vec<(Criterion, Option<Combinator>)>,
}

impl QueryGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a group from its first criterion.
    pub fn with(criterion: Criterion) -> Self {
        Self {
            entries: vec![(criterion, None)],
        }
    }

    /// Chains a criterion with AND.
    pub fn and(self, criterion: Criterion) -> Self {
        self.chain(Combinator::And, criterion)
    }

    /// Chains a criterion with OR.
    pub fn or(self, criterion: Criterion) -> Self {
        self.chain(Combinator::Or, criterion)
    }

    fn chain(mut self, combinator: Combinator, criterion: Criterion) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.1 = Some(combinator);
        }
        self.entries.push((criterion, None));
        self
    }

    pub fn entries(&self) -> &[(Criterion, Option<Combinator>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reasons a query group fails to compile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("query group contains no criteria")]
    EmptyGroup,
    #[error("dataset '{0}' is not registered")]
    UnknownDataset(String),
    #[error("field '{field}' does not exist in dataset '{dataset}'")]
    UnknownField { dataset: String, field: String },
    #[error("operator {op:?} cannot be applied to {field_type:?} field '{field}'")]
    OperatorMismatch {
        field: String,
        op: CriterionOp,
        field_type: FieldType,
    },
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    field: String,
    field_type: FieldType,
    op: CriterionOp,
    value: AttributeValue,
    combinator: Option<Combinator>,
}

/// A query group validated against one dataset's schema.
#[derive(Debug, Clone)]
pub struct Predicate {
    terms: Vec<CompiledTerm>,
}

/// Validates `group` against `dataset`'s schema.
///
/// Fails with [`ValidationError`] when the group is empty, a criterion
/// references an unknown field, or an operator does not apply to the
/// field's declared type. Type checking happens here, never at evaluation.
pub fn compile(group: &QueryGroup, dataset: &Dataset) -> Result<Predicate, ValidationError> {
    if group.is_empty() {
        return Err(ValidationError::EmptyGroup);
    }
    let mut terms = Vec::with_capacity(group.len());
    for (criterion, combinator) in group.entries() {
        let field = dataset
            .field(&criterion.field)
            .ok_or_else(|| ValidationError::UnknownField {
                dataset: dataset.id.clone(),
                field: criterion.field.clone(),
            })?;
        if !criterion.op.supports(field.field_type) {
            return Err(ValidationError::OperatorMismatch {
                field: criterion.field.clone(),
                op: criterion.op,
                field_type: field.field_type,
            });
        }
        terms.push(CompiledTerm {
            field: criterion.field.clone(),
            field_type: field.field_type,
            op: criterion.op,
            value: criterion.value.clone(),
            combinator: *combinator,
        });
    }
    Ok(Predicate { terms })
}

/// Evaluates the predicate against one feature.
///
/// Pure and total for any feature: a missing attribute matches only the
/// negated operators, a failed numeric coercion fails that criterion alone.
pub fn evaluate(predicate: &Predicate, feature: &Feature) -> bool {
    let mut terms = predicate.terms.iter();
    let first = match terms.next() {
        Some(t) => t,
        None => return false,
    };
    let mut result = eval_term(first, feature);
    let mut previous = first;
    for term in terms {
        let hit = eval_term(term, feature);
        result = match previous.combinator {
            Some(Combinator::Or) => result || hit,
            _ => result && hit,
        };
        previous = term;
    }
    result
}

/// Applies `predicate` to every feature in `dataset`, preserving the
/// dataset's feature order.
pub fn run<'a>(predicate: &Predicate, dataset: &'a Dataset) -> Vec<&'a Feature> {
    dataset
        .features()
        .iter()
        .filter(|f| evaluate(predicate, f))
        .collect()
}

fn eval_term(term: &CompiledTerm, feature: &Feature) -> bool {
    let value = feature.attribute(&term.field);
    let value = match value {
        None => return term.op.matches_missing(),
        Some(v) if v.is_null() => return term.op.matches_missing(),
        Some(v) => v,
    };
    match term.field_type {
        FieldType::Text => eval_text(term, value),
        FieldType::Number => eval_number(term, value),
        FieldType::Boolean => eval_boolean(term, value),
        FieldType::Date => eval_date(term, value),
    }
}

fn eval_text(term: &CompiledTerm, value: &AttributeValue) -> bool {
    let (actual, expected) = match (value.as_text(), term.value.as_text()) {
        (Some(a), Some(e)) => (a.to_lowercase(), e.to_lowercase()),
        _ => return false,
    };
    match term.op {
        CriterionOp::Contains => actual.contains(&expected),
        CriterionOp::NotContains => !actual.contains(&expected),
        CriterionOp::Equals => actual == expected,
        CriterionOp::NotEquals => actual != expected,
        CriterionOp::StartsWith => actual.starts_with(&expected),
        CriterionOp::EndsWith => actual.ends_with(&expected),
        _ => false,
    }
}

fn eval_number(term: &CompiledTerm, value: &AttributeValue) -> bool {
    let (actual, expected) = match (value.as_number(), term.value.as_number()) {
        (Some(a), Some(e)) => (a, e),
        _ => return false,
    };
    compare(term.op, actual.partial_cmp(&expected))
}

fn eval_boolean(term: &CompiledTerm, value: &AttributeValue) -> bool {
    let (actual, expected) = match (value.as_boolean(), term.value.as_boolean()) {
        (Some(a), Some(e)) => (a, e),
        _ => return false,
    };
    match term.op {
        CriterionOp::Equals => actual == expected,
        CriterionOp::NotEquals => actual != expected,
        _ => false,
    }
}

fn eval_date(term: &CompiledTerm, value: &AttributeValue) -> bool {
    let (actual, expected) = match (value.as_date(), term.value.as_date()) {
        (Some(a), Some(e)) => (a, e),
        _ => return false,
    };
    compare(term.op, Some(actual.cmp(&expected)))
}

fn compare(op: CriterionOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    let ordering = match ordering {
        Some(o) => o,
        None => return false,
    };
    match op {
        CriterionOp::Equals => ordering == Equal,
        CriterionOp::NotEquals => ordering != Equal,
        CriterionOp::GreaterThan => ordering == Greater,
        CriterionOp::LessThan => ordering == Less,
        CriterionOp::GreaterOrEqual => ordering != Less,
        CriterionOp::LessOrEqual => ordering != Greater,
        _ => false,
    }
}

/// Matches for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetHits {
    pub dataset_id: String,
    pub features: Vec<Feature>,
}

/// Result of one query execution, replaced wholesale by the next run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    /// Datasets with at least one match, in registry order.
    pub hits: Vec<DatasetHits>,
    /// Datasets skipped in an all-datasets run because their schema
    /// rejected the group.
    pub skipped_datasets: usize,
}

impl SearchResult {
    /// Total number of matched features across all datasets.
    pub fn total_count(&self) -> usize {
        self.hits.iter().map(|h| h.features.len()).sum()
    }

    /// Number of datasets with at least one match.
    pub fn dataset_count(&self) -> usize {
        self.hits.len()
    }
}
