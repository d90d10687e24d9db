//! Renders a command into one T-SQL batch for `sp_executesql`.
//!
//! Input values bind as `@P1..@Pn`. Output-direction parameters become local
//! variables declared ahead of the caller's SQL and read back by a trailing
//! `SELECT`:
//!
//! ```text
//! DECLARE @total DECIMAL(38,10);
//! DECLARE @count INT = @P2;
//! <caller SQL, or EXEC proc @id = @P1, @total = @total OUTPUT, ...>;
//! SET @__RowCount = @@ROWCOUNT;
//! SELECT @total AS [total], @count AS [count], @__RowCount AS [__RowCount];
//! ```
//!
//! The row count is captured right after the caller's SQL, so it reports the
//! last statement of that SQL.

use crate::command::Command;
use crate::translation::{PlaceholderStyle, bind_named_placeholders};
use crate::types::{CommandKind, ParameterDirection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderedBatch {
    pub sql: String,
    /// Parameter indices bound as `@P1..@Pn`, in that order.
    pub inputs: Vec<usize>,
    /// Bare names of the output variables selected at the end, in column order.
    pub outputs: Vec<String>,
    /// Whether the trailing `SELECT` carries [`ROW_COUNT_VARIABLE`].
    pub counts_rows: bool,
}

/// Variable holding `@@ROWCOUNT` of the caller's SQL when outputs are selected.
pub(crate) const ROW_COUNT_VARIABLE: &str = "__RowCount";

impl RenderedBatch {
    pub(crate) fn has_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// Render `command`; `with_outputs` controls whether the trailing `SELECT` of
/// output variables is appended.
pub(crate) fn render(command: &Command, with_outputs: bool) -> RenderedBatch {
    let inputs: Vec<usize> = command
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_input())
        .map(|(i, _)| i)
        .collect();
    let ordinal_of = |param_index: usize| {
        inputs
            .iter()
            .position(|&i| i == param_index)
            .map(|pos| pos + 1)
    };

    let mut sql = String::new();
    let mut outputs = Vec::new();
    let counts_rows = with_outputs && command.parameters.iter().any(|p| p.is_output());

    for (i, p) in command.parameters.iter().enumerate() {
        if !p.is_output() {
            continue;
        }
        sql.push_str("DECLARE @");
        sql.push_str(p.bare_name());
        sql.push(' ');
        sql.push_str(p.native_type);
        if p.direction == ParameterDirection::InputOutput
            && let Some(ordinal) = ordinal_of(i)
        {
            sql.push_str(&format!(" = @P{ordinal}"));
        }
        sql.push_str(";\n");
        outputs.push(p.bare_name().to_string());
    }
    if counts_rows {
        sql.push_str(&format!("DECLARE @{ROW_COUNT_VARIABLE} INT;\n"));
    }

    match command.kind {
        CommandKind::Text => {
            // only pure inputs are rewritten; in/out names stay as declared variables
            let names: Vec<&str> = inputs
                .iter()
                .map(|&i| {
                    let p = &command.parameters[i];
                    if p.direction == ParameterDirection::Input {
                        p.bare_name()
                    } else {
                        ""
                    }
                })
                .collect();
            let bound = bind_named_placeholders(&command.sql, &names, PlaceholderStyle::Numbered);
            sql.push_str(bound.sql.trim_end().trim_end_matches(';'));
        }
        CommandKind::StoredProcedure => {
            sql.push_str("EXEC ");
            if let Some(ret) = command
                .parameters
                .iter()
                .find(|p| p.direction == ParameterDirection::ReturnValue)
            {
                sql.push_str(&format!("@{} = ", ret.bare_name()));
            }
            sql.push_str(command.sql.trim());
            let args: Vec<String> = command
                .parameters
                .iter()
                .enumerate()
                .filter_map(|(i, p)| match p.direction {
                    ParameterDirection::Input => {
                        ordinal_of(i).map(|n| format!("@{} = @P{n}", p.bare_name()))
                    }
                    ParameterDirection::Output | ParameterDirection::InputOutput => {
                        Some(format!("@{0} = @{0} OUTPUT", p.bare_name()))
                    }
                    ParameterDirection::ReturnValue => None,
                })
                .collect();
            if !args.is_empty() {
                sql.push(' ');
                sql.push_str(&args.join(", "));
            }
        }
    }
    sql.push(';');

    if counts_rows {
        let mut cols: Vec<String> = outputs.iter().map(|n| format!("@{n} AS [{n}]")).collect();
        cols.push(format!("@{ROW_COUNT_VARIABLE} AS [{ROW_COUNT_VARIABLE}]"));
        sql.push_str(&format!("\nSET @{ROW_COUNT_VARIABLE} = @@ROWCOUNT;"));
        sql.push_str("\nSELECT ");
        sql.push_str(&cols.join(", "));
        sql.push(';');
    } else if !with_outputs {
        outputs.clear();
    }

    RenderedBatch {
        sql,
        inputs,
        outputs,
        counts_rows,
    }
}
