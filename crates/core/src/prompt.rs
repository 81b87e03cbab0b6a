//! Prompt composition.
//!
//! The wording of prompts belongs to the caller. The coordinator only hands a
//! [`PromptBuilder`] the selected text and the artifact path the job must
//! write to, and sends whatever comes back on the job's stdin.

use std::path::Path;

use crate::SelectionMode;

/// Inputs available when composing a job's prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
	/// Text of the selection as it was when the job started.
	pub selection: &'a str,
	pub mode: SelectionMode,
	/// Where the job must write its answer.
	pub output_path: &'a Path,
	/// File backing the document, if any.
	pub document_path: Option<&'a Path>,
}

/// Composes the bytes sent to a job on stdin.
pub trait PromptBuilder {
	fn build(&self, ctx: &PromptContext<'_>) -> String;
}

impl<F> PromptBuilder for F
where
	F: Fn(&PromptContext<'_>) -> String,
{
	fn build(&self, ctx: &PromptContext<'_>) -> String {
		self(ctx)
	}
}

/// Placeholder-substituting prompt.
///
/// Recognises `{instruction}`, `{selection}`, `{output}` and `{file}`. Unknown
/// braces are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePrompt {
	template: String,
	instruction: String,
}

impl TemplatePrompt {
	pub const DEFAULT_TEMPLATE: &'static str = "{instruction}\n\nWrite only the replacement text to {output}.\n\n{selection}\n";

	pub fn new(template: impl Into<String>, instruction: impl Into<String>) -> Self {
		Self {
			template: template.into(),
			instruction: instruction.into(),
		}
	}

	/// The default template with the given instruction.
	pub fn with_instruction(instruction: impl Into<String>) -> Self {
		Self::new(Self::DEFAULT_TEMPLATE, instruction)
	}

	pub fn template(&self) -> &str {
		&self.template
	}
}

impl PromptBuilder for TemplatePrompt {
	fn build(&self, ctx: &PromptContext<'_>) -> String {
		let output = ctx.output_path.to_string_lossy();
		let file = ctx.document_path.map(|p| p.to_string_lossy()).unwrap_or_default();
		// Single pass, so a selection containing a placeholder is not expanded again.
		let mut out = String::with_capacity(self.template.len() + ctx.selection.len());
		let mut rest = self.template.as_str();
		while let Some(open) = rest.find('{') {
			out.push_str(&rest[..open]);
			let tail = &rest[open..];
			let (value, len) = if tail.starts_with("{instruction}") {
				(self.instruction.as_str(), "{instruction}".len())
			} else if tail.starts_with("{selection}") {
				(ctx.selection, "{selection}".len())
			} else if tail.starts_with("{output}") {
				(&*output, "{output}".len())
			} else if tail.starts_with("{file}") {
				(&*file, "{file}".len())
			} else {
				("{", 1)
			};
			out.push_str(value);
			rest = &tail[len..];
		}
		out.push_str(rest);
		out
	}
}
