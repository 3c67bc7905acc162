//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/elif/else
//! - for loops
//! - C-style for loops
//! - while loops
//! - until loops
//! - case statements
//! - break/continue

use regex_lite::Regex;

use crate::ast::types::StatementNode;
use crate::interpreter::errors::{
    ControlFlowError, ExecutionLimitError, InterpreterError, LimitType,
};
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::helpers::loop_helpers::{handle_loop_error, LoopAction};
use crate::interpreter::interpreter::check_output_limit;
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterState};

/// Result of a `for` loop. Shares `ExecResult`'s shape (stdout/stderr/exit_code)
/// since loops don't carry anything a simple command result doesn't already have.
pub type ForResult = ExecResult;

/// Validate that a variable name is a valid identifier.
/// Returns true if valid, false otherwise.
pub fn is_valid_identifier(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
    re.is_match(name)
}

/// Run a sequence of statements (a loop/if body), accumulating output.
///
/// Mirrors the top-level script loop's error handling: `errexit` terminates
/// the sequence and folds into the result, break/continue/return/exit/
/// execution-limit propagate to the caller (the nearest loop or function),
/// and any other error becomes a diagnostic line with exit code 1.
pub(crate) fn run_body(
    state: &mut InterpreterState,
    stmts: &[&StatementNode],
    limits: &ExecutionLimits,
    exec: &mut impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
) -> Result<ExecResult, InterpreterError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    for stmt in stmts {
        match exec(state, stmt) {
            Ok(r) => {
                if let Some(msg) = check_output_limit(state, limits, &r.stdout, &r.stderr) {
                    stdout.push_str(&r.stdout);
                    stderr.push_str(&r.stderr);
                    return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                        msg,
                        LimitType::OutputSize,
                        stdout,
                        stderr,
                    )));
                }
                stdout.push_str(&r.stdout);
                stderr.push_str(&r.stderr);
                exit_code = r.exit_code;
            }
            Err(InterpreterError::Errexit(e)) => {
                stdout.push_str(&e.stdout);
                stderr.push_str(&e.stderr);
                return Ok(ExecResult::new(stdout, stderr, e.exit_code));
            }
            Err(InterpreterError::Break(mut e)) => {
                e.prepend_output(&stdout, &stderr);
                return Err(InterpreterError::Break(e));
            }
            Err(InterpreterError::Continue(mut e)) => {
                e.prepend_output(&stdout, &stderr);
                return Err(InterpreterError::Continue(e));
            }
            Err(InterpreterError::Return(mut e)) => {
                e.prepend_output(&stdout, &stderr);
                return Err(InterpreterError::Return(e));
            }
            Err(InterpreterError::Exit(mut e)) => {
                e.prepend_output(&stdout, &stderr);
                return Err(InterpreterError::Exit(e));
            }
            Err(InterpreterError::ExecutionLimit(mut e)) => {
                e.prepend_output(&stdout, &stderr);
                return Err(InterpreterError::ExecutionLimit(e));
            }
            Err(other) => {
                stderr.push_str(&format!("{}\n", other));
                exit_code = 1;
            }
        }
    }

    Ok(ExecResult::new(stdout, stderr, exit_code))
}

/// Evaluate a condition (a list of statements; the exit code of the last one
/// decides truth, per POSIX `if`/`while`/`until` semantics).
fn run_condition(
    state: &mut InterpreterState,
    stmts: &[&StatementNode],
    eval: &mut impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
) -> Result<(String, String, i32), InterpreterError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    for stmt in stmts {
        let cr = eval(state, stmt)?;
        stdout.push_str(&cr.stdout);
        stderr.push_str(&cr.stderr);
        exit_code = cr.exit_code;
    }

    Ok((stdout, stderr, exit_code))
}

fn iteration_limit_error(max_iterations: u64, stdout: String, stderr: String) -> InterpreterError {
    InterpreterError::ExecutionLimit(ExecutionLimitError::new(
        format!("maximum loop iterations ({}) exceeded", max_iterations),
        LimitType::Iterations,
        stdout,
        stderr,
    ))
}

/// Execute an `if`/`elif`/`else` chain.
///
/// `clauses` is the list of (condition, body) pairs in source order (the
/// `if` clause first, then each `elif`). The first clause whose condition
/// exits 0 has its body executed; if none match, `else_body` runs instead.
pub fn execute_if(
    state: &mut InterpreterState,
    clauses: &[(Vec<&StatementNode>, Vec<&StatementNode>)],
    else_body: Option<&[&StatementNode]>,
    limits: &ExecutionLimits,
    mut eval_cond: impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    mut exec_stmt: impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
) -> Result<ExecResult, InterpreterError> {
    let mut stdout = String::new();
    let mut stderr = String::new();

    for (condition, body) in clauses {
        let (cond_out, cond_err, cond_exit) = run_condition(state, condition, &mut eval_cond)?;
        stdout.push_str(&cond_out);
        stderr.push_str(&cond_err);

        if cond_exit == 0 {
            let result = run_body(state, body, limits, &mut exec_stmt)?;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            return Ok(ExecResult::new(stdout, stderr, result.exit_code));
        }
    }

    if let Some(else_stmts) = else_body {
        let result = run_body(state, else_stmts, limits, &mut exec_stmt)?;
        stdout.push_str(&result.stdout);
        stderr.push_str(&result.stderr);
        return Ok(ExecResult::new(stdout, stderr, result.exit_code));
    }

    Ok(ExecResult::new(stdout, stderr, 0))
}

/// Execute a `for word in list; do ... done` loop.
pub fn execute_for(
    state: &mut InterpreterState,
    variable: &str,
    words: &[String],
    body: &[&StatementNode],
    limits: &ExecutionLimits,
    mut exec_stmt: impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
) -> Result<ForResult, InterpreterError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;
    let mut iterations: u64 = 0;

    state.loop_depth += 1;
    let loop_depth = state.loop_depth;

    for word in words {
        iterations += 1;
        if iterations > limits.max_iterations {
            state.loop_depth -= 1;
            return Err(iteration_limit_error(limits.max_iterations, stdout, stderr));
        }

        state.env.insert(variable.to_string(), word.clone());

        match run_body(state, body, limits, &mut exec_stmt) {
            Ok(r) => {
                stdout.push_str(&r.stdout);
                stderr.push_str(&r.stderr);
                exit_code = r.exit_code;
            }
            Err(e) => {
                let res = handle_loop_error(e, stdout, stderr, loop_depth);
                match res.action {
                    LoopAction::Break => {
                        stdout = res.stdout;
                        stderr = res.stderr;
                        break;
                    }
                    LoopAction::Continue => {
                        stdout = res.stdout;
                        stderr = res.stderr;
                        continue;
                    }
                    LoopAction::Rethrow => {
                        state.loop_depth -= 1;
                        return Err(res.error.unwrap());
                    }
                    LoopAction::Error => {
                        state.loop_depth -= 1;
                        return Ok(ExecResult::new(res.stdout, res.stderr, res.exit_code.unwrap_or(1)));
                    }
                }
            }
        }
    }

    state.loop_depth -= 1;
    Ok(ExecResult::new(stdout, stderr, exit_code))
}

/// Execute a `while condition; do ... done` loop.
pub fn execute_while(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    limits: &ExecutionLimits,
    mut eval_cond: impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    mut exec_stmt: impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
) -> Result<ExecResult, InterpreterError> {
    run_conditional_loop(state, condition, body, limits, false, &mut eval_cond, &mut exec_stmt)
}

/// Execute an `until condition; do ... done` loop (the inverse of `while`).
pub fn execute_until(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    limits: &ExecutionLimits,
    mut eval_cond: impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    mut exec_stmt: impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
) -> Result<ExecResult, InterpreterError> {
    run_conditional_loop(state, condition, body, limits, true, &mut eval_cond, &mut exec_stmt)
}

fn run_conditional_loop(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    limits: &ExecutionLimits,
    until: bool,
    eval_cond: &mut impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    exec_stmt: &mut impl FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
) -> Result<ExecResult, InterpreterError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;
    let mut iterations: u64 = 0;

    state.loop_depth += 1;
    let loop_depth = state.loop_depth;

    loop {
        iterations += 1;
        if iterations > limits.max_iterations {
            state.loop_depth -= 1;
            return Err(iteration_limit_error(limits.max_iterations, stdout, stderr));
        }

        let (cond_out, cond_err, cond_exit) = match run_condition(state, condition, eval_cond) {
            Ok(v) => v,
            Err(e) => {
                state.loop_depth -= 1;
                return Err(e);
            }
        };
        stdout.push_str(&cond_out);
        stderr.push_str(&cond_err);

        let keep_going = if until { cond_exit != 0 } else { cond_exit == 0 };
        if !keep_going {
            break;
        }

        match run_body(state, body, limits, exec_stmt) {
            Ok(r) => {
                stdout.push_str(&r.stdout);
                stderr.push_str(&r.stderr);
                exit_code = r.exit_code;
            }
            Err(e) => {
                let res = handle_loop_error(e, stdout, stderr, loop_depth);
                match res.action {
                    LoopAction::Break => {
                        stdout = res.stdout;
                        stderr = res.stderr;
                        break;
                    }
                    LoopAction::Continue => {
                        stdout = res.stdout;
                        stderr = res.stderr;
                        continue;
                    }
                    LoopAction::Rethrow => {
                        state.loop_depth -= 1;
                        return Err(res.error.unwrap());
                    }
                    LoopAction::Error => {
                        state.loop_depth -= 1;
                        return Ok(ExecResult::new(res.stdout, res.stderr, res.exit_code.unwrap_or(1)));
                    }
                }
            }
        }
    }

    state.loop_depth -= 1;
    Ok(ExecResult::new(stdout, stderr, exit_code))
}

/// Case statement terminator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// ;; - stop, no fall-through
    Break,
    /// ;& - unconditional fall-through (execute next body without pattern check)
    FallThrough,
    /// ;;& - continue pattern matching (check next case patterns)
    ContinueMatching,
}

impl CaseTerminator {
    /// Parse a terminator string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            ";;" => Some(CaseTerminator::Break),
            ";&" => Some(CaseTerminator::FallThrough),
            ";;&" => Some(CaseTerminator::ContinueMatching),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseTerminator::Break => ";;",
            CaseTerminator::FallThrough => ";&",
            CaseTerminator::ContinueMatching => ";;&",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_bar"));
        assert!(is_valid_identifier("foo123"));
        assert!(is_valid_identifier("_123"));
        assert!(!is_valid_identifier("123foo"));
        assert!(!is_valid_identifier("foo-bar"));
        assert!(!is_valid_identifier("foo bar"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_case_terminator() {
        assert_eq!(CaseTerminator::from_str(";;"), Some(CaseTerminator::Break));
        assert_eq!(CaseTerminator::from_str(";&"), Some(CaseTerminator::FallThrough));
        assert_eq!(CaseTerminator::from_str(";;&"), Some(CaseTerminator::ContinueMatching));
        assert_eq!(CaseTerminator::from_str("invalid"), None);

        assert_eq!(CaseTerminator::Break.as_str(), ";;");
        assert_eq!(CaseTerminator::FallThrough.as_str(), ";&");
        assert_eq!(CaseTerminator::ContinueMatching.as_str(), ";;&");
    }
}
