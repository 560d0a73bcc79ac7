//! Prompt templates with `{name}` placeholders.

use std::collections::HashMap;

use crate::error::{RagError, Result};

/// The answer the QA prompt asks for when the context lacks the information.
pub const NOT_IN_DOCUMENT: &str = "The document does not contain this information.";

/// Template used for grounded question answering over retrieved context.
pub const QA_TEMPLATE: &str = "You are a helpful assistant. Only use the content from the retrieved documents to answer the question. Do NOT make up any information. If the answer is not in the document, say \"The document does not contain this information.\"\n\nContext: {context}\nQuestion: {question}\nAnswer:";

/// A text template with named `{variable}` placeholders.
///
/// `{{` and `}}` produce literal braces. Substitution happens in one pass, so
/// braces inside substituted values are never treated as placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a template, declaring the variables `format` must receive.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the template uses a placeholder
    /// that is not declared, or has an unmatched brace.
    pub fn new(template: impl Into<String>, input_variables: &[&str]) -> Result<Self> {
        let template = template.into();
        let input_variables: Vec<String> = input_variables.iter().map(|v| v.to_string()).collect();

        for name in placeholders(&template)? {
            if !input_variables.iter().any(|v| v == name) {
                return Err(RagError::ConfigError(format!(
                    "template uses undeclared variable '{name}'"
                )));
            }
        }

        Ok(Self { template, input_variables })
    }

    /// The fixed question-answering prompt over `{context}` and `{question}`.
    pub fn question_answering() -> Self {
        Self {
            template: QA_TEMPLATE.to_string(),
            input_variables: vec!["context".to_string(), "question".to_string()],
        }
    }

    /// The declared input variables.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Render the template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a declared variable has no value.
    pub fn format(&self, values: &HashMap<&str, &str>) -> Result<String> {
        if let Some(missing) = self.input_variables.iter().find(|v| !values.contains_key(v.as_str()))
        {
            return Err(RagError::ConfigError(format!("missing prompt variable '{missing}'")));
        }

        let mut out = String::with_capacity(self.template.len());
        render(&self.template, |name| values.get(name).copied(), &mut out)?;
        Ok(out)
    }
}

/// Names of the placeholders used in `template`.
fn placeholders(template: &str) -> Result<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        let (brace, after) = (&rest[pos..pos + 1], &rest[pos + 1..]);
        if after.starts_with(brace) {
            rest = &after[1..];
            continue;
        }
        if brace == "}" {
            return Err(RagError::ConfigError("unmatched '}' in template".into()));
        }
        let end = after
            .find('}')
            .ok_or_else(|| RagError::ConfigError("unclosed '{' in template".into()))?;
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    Ok(names)
}

fn render<'v>(
    template: &str,
    lookup: impl Fn(&str) -> Option<&'v str>,
    out: &mut String,
) -> Result<()> {
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let (brace, after) = (&rest[pos..pos + 1], &rest[pos + 1..]);
        if after.starts_with(brace) {
            out.push_str(brace);
            rest = &after[1..];
            continue;
        }
        let end = after
            .find('}')
            .ok_or_else(|| RagError::ConfigError("unclosed '{' in template".into()))?;
        let name = &after[..end];
        let value = lookup(name)
            .ok_or_else(|| RagError::ConfigError(format!("missing prompt variable '{name}'")))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(())
}
