//! Command rendering against a job context.
//!
//! The rendering contract: `{{SOURCE_DIR}}` and `{{OUTPUT_DIR}}`
//! substitute the staging directories, `{{DEP:<job-id-hex>}}`
//! substitutes the materialized directory of that upstream artifact.
//! Placeholders apply to argv elements, environment values, the
//! working directory, and the cat template and its output path. A
//! command with no argv but a cat template renders to a shell command
//! that writes the literal file, so executors never special-case cat.

use quarry_id::JobId;

use crate::error::RenderError;
use crate::types::{Command, JobContext};

impl Command {
    /// Resolves placeholders and yields a concrete command whose argv
    /// is ready to spawn.
    pub fn render(&self, ctx: &JobContext) -> Result<Command, RenderError> {
        let mut argv = self
            .argv
            .iter()
            .map(|arg| substitute(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        let env = self
            .env
            .iter()
            .map(|(key, value)| Ok((key.clone(), substitute(value, ctx)?)))
            .collect::<Result<_, RenderError>>()?;

        let working_dir = self
            .working_dir
            .as_deref()
            .map(|dir| substitute(dir, ctx))
            .transpose()?;

        if argv.is_empty() {
            let (Some(template), Some(output)) = (&self.cat_template, &self.cat_output) else {
                return Err(RenderError::EmptyCommand);
            };
            let body = substitute(template, ctx)?;
            let path = substitute(output, ctx)?;
            argv = vec![
                "bash".to_string(),
                "-c".to_string(),
                format!("printf %s {} > {}", shell_quote(&body), shell_quote(&path)),
            ];
        }

        Ok(Command {
            argv,
            env,
            working_dir,
            cat_template: None,
            cat_output: None,
        })
    }
}

fn substitute(input: &str, ctx: &JobContext) -> Result<String, RenderError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(RenderError::Unterminated(input.to_string()));
        };

        let token = &after[..end];
        if token == "SOURCE_DIR" {
            out.push_str(&ctx.source_dir.to_string_lossy());
        } else if token == "OUTPUT_DIR" {
            out.push_str(&ctx.output_dir.to_string_lossy());
        } else if let Some(hex) = token.strip_prefix("DEP:") {
            let id = JobId::parse(hex)
                .map_err(|_| RenderError::UnknownPlaceholder(token.to_string()))?;
            let dir = ctx.deps.get(&id).ok_or(RenderError::UnknownDep(id))?;
            out.push_str(&dir.to_string_lossy());
        } else {
            return Err(RenderError::UnknownPlaceholder(token.to_string()));
        }

        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Single-quotes a string for `bash -c`.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
