//! Console completion of fields the batch could not resolve.

use console::{Term, style};

use procura_core::{FieldCompleter, ProcuraError, ResolvedContext, validate_field};

/// Asks the operator for every missing field, re-asking until the value
/// passes validation.
pub struct ConsoleCompleter {
    term: Term,
}

impl ConsoleCompleter {
    pub fn new() -> Self {
        Self { term: Term::stderr() }
    }

    fn ask(&self, field: &str) -> Result<String, ProcuraError> {
        loop {
            self.term
                .write_str(&format!("{} {}: ", style("?").cyan(), style(field).bold()))?;
            let answer = self.term.read_line()?;

            match validate_field(field, &answer) {
                Ok(()) => return Ok(answer.trim().to_string()),
                Err(e) => self
                    .term
                    .write_line(&format!("{} {}", style("✗").red(), e))?,
            }
        }
    }
}

impl Default for ConsoleCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldCompleter for ConsoleCompleter {
    fn complete(
        &mut self,
        mut context: ResolvedContext,
        missing: &[String],
    ) -> procura_core::Result<ResolvedContext> {
        // read_line returns empty strings forever when nobody is there to answer
        if !self.term.features().is_attended() {
            return match missing.first() {
                Some(field) => Err(ProcuraError::MissingField(field.clone())),
                None => Ok(context),
            };
        }

        self.term.write_line(&format!(
            "{} {} fields could not be read from the documents:",
            style("ℹ").blue(),
            missing.len()
        ))?;

        for field in missing {
            let value = self.ask(field)?;
            context.insert(field.as_str(), value);
        }
        Ok(context)
    }
}
