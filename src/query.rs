//! Structured queries against parsed documents.
//!
//! Rule matching only needs "evaluate an expression against a tree and get a
//! value or nothing", so the query language sits behind [`QueryEngine`].

use serde_json::Value;

use crate::error::QueryError;

/// Evaluates path expressions against a document tree.
pub trait QueryEngine {
    /// Evaluate `expression` against `document`.
    ///
    /// Returns `Ok(None)` when the expression selects nothing.
    fn evaluate(&self, expression: &str, document: &Value) -> Result<Option<Value>, QueryError>;
}

/// [JMESPath](https://jmespath.org) query engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct JmespathEngine;

impl QueryEngine for JmespathEngine {
    fn evaluate(&self, expression: &str, document: &Value) -> Result<Option<Value>, QueryError> {
        let compiled = jmespath::compile(expression).map_err(|e| QueryError::Compile {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;

        let result = compiled
            .search(document)
            .map_err(|e| QueryError::Evaluate {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;

        if result.is_null() {
            return Ok(None);
        }

        serde_json::to_value(&*result)
            .map(Some)
            .map_err(|e| QueryError::Evaluate {
                expression: expression.to_string(),
                message: e.to_string(),
            })
    }
}
