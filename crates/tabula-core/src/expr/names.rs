//! Output-name derivation and aliasing.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::schema::StructType;

/// Which input columns a selection refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Names(Vec<String>),
    All,
    Exclude(Vec<String>),
    /// Positional selection; negative indices count from the end.
    Indices(Vec<i64>),
}

impl Selection {
    pub fn resolve(&self, schema: &StructType, validate: bool) -> Result<Vec<String>> {
        match self {
            Selection::Names(names) => {
                if validate {
                    if let Some(missing) = names.iter().find(|n| !schema.contains(n)) {
                        return Err(EngineError::NotFound(format!(
                            "column '{missing}' not found; available columns: {:?}",
                            schema.names()
                        )));
                    }
                }
                Ok(names.clone())
            }
            Selection::All => Ok(schema.names()),
            Selection::Exclude(excluded) => Ok(schema
                .names()
                .into_iter()
                .filter(|n| !excluded.contains(n))
                .collect()),
            Selection::Indices(indices) => {
                let fields = schema.fields();
                let len = fields.len() as i64;
                indices
                    .iter()
                    .map(|&i| {
                        let idx = if i < 0 { len + i } else { i };
                        if idx < 0 || idx >= len {
                            return Err(EngineError::NotFound(format!(
                                "column index {i} out of range for {len} columns"
                            )));
                        }
                        Ok(fields[idx as usize].name.clone())
                    })
                    .collect()
            }
        }
    }
}

/// Root names an expression produces before any alias transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputNames {
    Selection(Selection),
    /// A literal always produces one column named `literal`.
    Literal,
    /// Only the first name of the inner derivation (horizontal combinations).
    First(Box<OutputNames>),
}

impl OutputNames {
    pub fn resolve(&self, schema: &StructType, validate: bool) -> Result<Vec<String>> {
        match self {
            OutputNames::Selection(selection) => selection.resolve(schema, validate),
            OutputNames::Literal => Ok(vec!["literal".to_string()]),
            OutputNames::First(inner) => {
                let mut names = inner.resolve(schema, validate)?;
                names.truncate(1);
                Ok(names)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasOp {
    Name(String),
    Prefix(String),
    Suffix(String),
    ToUppercase,
    ToLowercase,
    /// Keep at most the first name.
    First,
}

impl AliasOp {
    fn apply(&self, names: Vec<String>) -> Result<Vec<String>> {
        Ok(match self {
            AliasOp::Name(name) => {
                if names.len() != 1 {
                    return Err(EngineError::User(format!(
                        "expected a single output name to alias as '{name}', got {}: {names:?}",
                        names.len()
                    )));
                }
                vec![name.clone()]
            }
            AliasOp::Prefix(p) => names.into_iter().map(|n| format!("{p}{n}")).collect(),
            AliasOp::Suffix(s) => names.into_iter().map(|n| format!("{n}{s}")).collect(),
            AliasOp::ToUppercase => names.into_iter().map(|n| n.to_uppercase()).collect(),
            AliasOp::ToLowercase => names.into_iter().map(|n| n.to_lowercase()).collect(),
            AliasOp::First => names.into_iter().take(1).collect(),
        })
    }
}

/// Ordered chain of rename transforms, applied first to last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasNames(Vec<AliasOp>);

impl AliasNames {
    pub fn new(op: AliasOp) -> Self {
        AliasNames(vec![op])
    }

    /// `next` runs after every transform already in the chain.
    pub fn then(&self, next: &AliasNames) -> Self {
        let mut ops = self.0.clone();
        ops.extend(next.0.iter().cloned());
        AliasNames(ops)
    }

    pub fn ops(&self) -> &[AliasOp] {
        &self.0
    }

    pub fn apply(&self, names: Vec<String>) -> Result<Vec<String>> {
        self.0.iter().try_fold(names, |acc, op| op.apply(acc))
    }
}

impl From<AliasOp> for AliasNames {
    fn from(op: AliasOp) -> Self {
        AliasNames::new(op)
    }
}
