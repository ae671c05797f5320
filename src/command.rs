//! Provider-agnostic command descriptors.
//!
//! A [`SqlCommand`] carries the statement text (or stored procedure name),
//! the command kind, a per-command timeout, and an ordered parameter list.
//! Commands are plain data: drivers translate them into native statements at
//! execution time.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::params::{ParameterDirection, SqlParameter, format_parameter_name};
use crate::traits::types::DEFAULT_COMMAND_TIMEOUT;
use crate::traits::{SqlType, Value};

/// What the command text means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Free-form SQL text.
    Text,
    /// The name of a stored procedure.
    StoredProcedure,
}

/// A command to run against a backend.
#[derive(Debug, Clone)]
pub struct SqlCommand {
    text: String,
    kind: CommandKind,
    timeout: Duration,
    parameters: Vec<SqlParameter>,
}

impl SqlCommand {
    fn new(text: &str, kind: CommandKind, timeout: Duration) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::EmptyCommandText);
        }
        Ok(Self {
            text: text.to_string(),
            kind,
            timeout,
            parameters: Vec::new(),
        })
    }

    /// Create a free-form SQL text command.
    pub fn sql_text(text: &str) -> Result<Self> {
        Self::new(text, CommandKind::Text, DEFAULT_COMMAND_TIMEOUT)
    }

    /// Create a stored procedure command from the procedure name.
    pub fn stored_procedure(name: &str) -> Result<Self> {
        Self::new(name, CommandKind::StoredProcedure, DEFAULT_COMMAND_TIMEOUT)
    }

    /// Override the command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The statement text or procedure name.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The command kind.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The command timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The declared parameters, in declaration order.
    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    /// Add a fully described parameter.
    ///
    /// Fails if a parameter with the same (case-insensitive) name is already
    /// declared.
    pub fn add_parameter(&mut self, parameter: SqlParameter) -> Result<&mut Self> {
        if self
            .parameters
            .iter()
            .any(|p| p.name().eq_ignore_ascii_case(parameter.name()))
        {
            return Err(Error::DuplicateParameter(parameter.name().to_string()));
        }
        self.parameters.push(parameter);
        Ok(self)
    }

    /// Add an input parameter.
    pub fn add_in_parameter(
        &mut self,
        name: &str,
        sql_type: SqlType,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.add_parameter(SqlParameter::new(name, sql_type, value)?)
    }

    /// Add an input parameter with a size hint.
    pub fn add_in_parameter_with_size(
        &mut self,
        name: &str,
        sql_type: SqlType,
        size: u32,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.add_parameter(SqlParameter::new(name, sql_type, value)?.with_size(size))
    }

    /// Add an output parameter.
    pub fn add_out_parameter(&mut self, name: &str, sql_type: SqlType) -> Result<&mut Self> {
        self.add_parameter(SqlParameter::output(name, sql_type)?)
    }

    /// Add an output parameter with a size hint.
    pub fn add_out_parameter_with_size(
        &mut self,
        name: &str,
        sql_type: SqlType,
        size: u32,
    ) -> Result<&mut Self> {
        self.add_parameter(SqlParameter::output(name, sql_type)?.with_size(size))
    }

    /// Add a parameter whose value flows in and is updated on the way out.
    pub fn add_in_out_parameter(
        &mut self,
        name: &str,
        sql_type: SqlType,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.add_parameter(
            SqlParameter::new(name, sql_type, value)?
                .with_direction(ParameterDirection::InputOutput),
        )
    }

    /// Look up a parameter by name. The marker is optional.
    pub fn parameter(&self, name: &str) -> Option<&SqlParameter> {
        let normalized = format_parameter_name(name).ok()?;
        self.parameters
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(&normalized))
    }

    /// Read a parameter's value back, e.g. after a stored procedure call
    /// populated its output parameters.
    pub fn parameter_value(&self, name: &str) -> Result<&Value> {
        self.parameter(name)
            .map(|p| p.value())
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    /// Set a parameter's value by name, e.g. after discovery added the
    /// parameter without one.
    pub fn set_parameter_value(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let normalized = format_parameter_name(name)?;
        let parameter = self
            .parameters
            .iter_mut()
            .find(|p| p.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        parameter.set_value(value.into());
        Ok(())
    }

    pub(crate) fn set_parameter_value_at(&mut self, index: usize, value: Value) {
        if let Some(parameter) = self.parameters.get_mut(index) {
            parameter.set_value(value);
        }
    }
}
