use crate::actions::ActionSpec;
use crate::errors::{ParserError, Result};
use crate::transforms::TransformStep;
use serde::{Deserialize, Serialize};

/// A node of the extraction tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub scope: Option<String>,
    pub parent_scope: Option<String>,
    pub name: Option<String>,
    pub collection: Option<Vec<RuleNode>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<TransformStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionSpec>,
    #[serde(rename = "type", default)]
    pub result_type: ResultType,
    pub separator: Option<String>,
    /// Read this attribute instead of the node text.
    pub attr: Option<String>,
    /// Read this node property instead of the node text.
    pub prop: Option<String>,
    /// Stored for sibling transforms but left out of the parent's output.
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
}

/// One entry of `collection`: a sub-rule, or a row template (grid).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Row(Vec<Rule>),
    Rule(Box<Rule>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    String,
    Array,
}

/// Structural classification of a rule.
#[derive(Debug)]
pub enum RuleKind<'a> {
    Simple,
    Collection(Vec<&'a Rule>),
    Grid(&'a [Rule]),
}

impl Rule {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_collection(mut self, rules: Vec<Rule>) -> Self {
        self.collection = Some(rules.into_iter().map(|r| RuleNode::Rule(Box::new(r))).collect());
        self
    }

    pub fn with_grid(mut self, row: Vec<Rule>) -> Self {
        self.collection = Some(vec![RuleNode::Row(row)]);
        self
    }

    pub fn with_transform(mut self, step: TransformStep) -> Self {
        self.transform.push(step);
        self
    }

    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }

    pub fn as_array(mut self) -> Self {
        self.result_type = ResultType::Array;
        self
    }

    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(" ")
    }

    /// Classify by the shape of `collection`.
    pub fn kind(&self) -> Result<RuleKind<'_>> {
        let nodes = match &self.collection {
            None => return Ok(RuleKind::Simple),
            Some(nodes) => nodes,
        };

        match nodes.first() {
            None => Err(ParserError::InvalidRule(format!(
                "empty collection in rule {}",
                self.describe()
            ))),
            Some(RuleNode::Row(template)) => Ok(RuleKind::Grid(template)),
            Some(RuleNode::Rule(_)) => nodes
                .iter()
                .map(|node| match node {
                    RuleNode::Rule(rule) => Ok(rule.as_ref()),
                    RuleNode::Row(_) => Err(ParserError::InvalidRule(format!(
                        "collection of rule {} mixes rules and rows",
                        self.describe()
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(RuleKind::Collection),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match (&self.name, &self.scope) {
            (Some(name), _) => format!("`{}`", name),
            (None, Some(scope)) => format!("with scope `{}`", scope),
            (None, None) => "<root>".to_string(),
        }
    }
}
