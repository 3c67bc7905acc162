//! Execution Engine
//!
//! The core execution engine that ties all interpreter components together.
//! Implements the full AST execution chain:
//!
//! execute_script -> execute_statement -> execute_pipeline -> execute_command

use std::sync::Arc;

use crate::ast::types::{
    CommandNode, CompoundCommandNode, PipelineNode, ScriptNode, SimpleCommandNode, StatementNode,
    StatementOperator,
};
use crate::commands::registry::{global_registry, CommandRegistry};
use crate::commands::types::{CommandContext, CommandResult};
use crate::fs::FileSystem as AsyncFileSystem;
use crate::interpreter::builtin_dispatch::{dispatch_builtin, BuiltinDispatchContext};
use crate::interpreter::control_flow::{execute_for, execute_if, execute_while, execute_until, ForResult};
use crate::interpreter::errors::{InterpreterError, ErrexitError, ControlFlowError};
use crate::interpreter::functions::{call_function, get_function};
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::interpreter::{
    build_exported_env, check_command_limit, should_trigger_errexit, update_exit_code,
    FileSystem as SyncFileSystem,
};
use crate::interpreter::pipeline_execution::{execute_pipeline, PipelineOptions, PipelineState, set_pipestatus};
use crate::interpreter::redirections::apply_redirections;
use crate::interpreter::simple_command_assignments::process_assignments;
use crate::interpreter::subshell_group::{execute_group, execute_subshell};
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterState};
use crate::interpreter::word_expansion::{expand_word, expand_word_with_glob, CommandRunner};

/// Convert a propagated control-flow/limit error into a plain result, the
/// way the top-level script loop does for errors it can't otherwise handle.
/// Used at the handful of seams (recursive `exec`/`command`/`builtin`, here
/// documents in command substitution) where the surrounding API can't carry
/// a `Result`.
fn error_to_exec_result(e: InterpreterError) -> ExecResult {
    match e {
        InterpreterError::Exit(e) => ExecResult::new(e.stdout, e.stderr, e.exit_code),
        InterpreterError::ExecutionLimit(e) => ExecResult::new(e.stdout, e.stderr, 126),
        other => ExecResult::new(String::new(), format!("{}\n", other), 1),
    }
}

/// The execution engine that ties all interpreter components together.
pub struct ExecutionEngine<'a> {
    /// Execution limits (max commands, recursion depth, iterations)
    pub limits: &'a ExecutionLimits,
    /// Sync filesystem interface, used by the interpreter's own control flow
    pub fs: &'a dyn SyncFileSystem,
    /// Async filesystem, passed through to external commands (`cat`, `grep`, ...)
    pub async_fs: Arc<dyn AsyncFileSystem>,
    /// Tokio handle used to bridge into external commands' async `execute`
    pub handle: tokio::runtime::Handle,
    /// External command lookup table (spec Command Dispatcher component)
    pub registry: &'static CommandRegistry,
}

impl<'a> ExecutionEngine<'a> {
    /// Create a new execution engine.
    pub fn new(
        limits: &'a ExecutionLimits,
        fs: &'a dyn SyncFileSystem,
        async_fs: Arc<dyn AsyncFileSystem>,
        handle: tokio::runtime::Handle,
    ) -> Self {
        Self {
            limits,
            fs,
            async_fs,
            handle,
            registry: global_registry(),
        }
    }

    /// Run a parsed command-substitution body, folding propagated errors
    /// into a plain result the way the top-level script loop does.
    fn run_substitution(&self, state: &mut InterpreterState, script: &ScriptNode) -> ExecResult {
        match self.execute_script(state, script) {
            Ok(r) => r,
            Err(e) => error_to_exec_result(e),
        }
    }

    /// A `CommandRunner` for word expansion's command substitution.
    fn substitution_runner(&self) -> impl Fn(&mut InterpreterState, &ScriptNode) -> ExecResult + '_ {
        move |state, script| self.run_substitution(state, script)
    }

    /// Execute a complete script (list of statements).
    pub fn execute_script(
        &self,
        state: &mut InterpreterState,
        ast: &ScriptNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for statement in &ast.statements {
            match self.execute_statement(state, statement) {
                Ok(result) => {
                    stdout.push_str(&result.stdout);
                    stderr.push_str(&result.stderr);
                    exit_code = result.exit_code;
                    update_exit_code(state, exit_code);
                }
                Err(InterpreterError::Exit(e)) => {
                    // ExitError propagates up to terminate the script
                    let mut err = e;
                    err.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Exit(err));
                }
                Err(InterpreterError::ExecutionLimit(e)) => {
                    // ExecutionLimitError must always propagate
                    return Err(InterpreterError::ExecutionLimit(e));
                }
                Err(InterpreterError::Errexit(e)) => {
                    // Errexit terminates the script
                    stdout.push_str(&e.stdout);
                    stderr.push_str(&e.stderr);
                    exit_code = e.exit_code;
                    return Ok(ExecResult::new(stdout, stderr, exit_code));
                }
                Err(InterpreterError::Break(mut e)) => {
                    // Break/continue outside loops - silently continue
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Continue(mut e)) => {
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Return(mut e)) => {
                    // Return outside function - propagate
                    e.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Return(e));
                }
                Err(e) => {
                    // Other errors - convert to result
                    stderr.push_str(&format!("{}\n", e));
                    exit_code = 1;
                }
            }
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a single statement (list of pipelines with && || operators).
    pub fn execute_statement(
        &self,
        state: &mut InterpreterState,
        stmt: &StatementNode,
    ) -> Result<ExecResult, InterpreterError> {
        // Handle deferred syntax errors
        if let Some(ref err) = stmt.deferred_error {
            return Ok(ExecResult::new(
                String::new(),
                format!("bash: syntax error near unexpected token `{}'\n", err.token),
                2,
            ));
        }

        // noexec mode (set -n): parse but don't execute
        if state.options.noexec {
            return Ok(ExecResult::ok());
        }

        // Reset errexit_safe at start of each statement
        state.errexit_safe = Some(false);

        let mut stdout = String::new();
        let mut stderr = String::new();

        // verbose mode (set -v): print source before execution
        if state.options.verbose {
            if let Some(ref source) = stmt.source_text {
                stderr.push_str(source);
                stderr.push('\n');
            }
        }

        let mut exit_code = 0;
        let mut last_executed_index: i32 = -1;
        let mut last_pipeline_negated = false;

        for (i, pipeline) in stmt.pipelines.iter().enumerate() {
            // Check && / || short-circuit
            if i > 0 {
                let op = &stmt.operators[i - 1];
                match op {
                    StatementOperator::And => {
                        if exit_code != 0 {
                            continue;
                        }
                    }
                    StatementOperator::Or => {
                        if exit_code == 0 {
                            continue;
                        }
                    }
                    StatementOperator::Semi => {
                        // Always execute
                    }
                }
            }

            let result = self.execute_pipeline_node(state, pipeline)?;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            exit_code = result.exit_code;
            last_executed_index = i as i32;
            last_pipeline_negated = pipeline.negated;

            update_exit_code(state, exit_code);
        }

        // Check errexit
        let was_short_circuited = last_executed_index < (stmt.pipelines.len() as i32 - 1);
        let inner_was_safe = state.errexit_safe.unwrap_or(false);

        if should_trigger_errexit(state, exit_code, was_short_circuited, last_pipeline_negated)
            && !inner_was_safe
        {
            return Err(InterpreterError::Errexit(ErrexitError::new(
                exit_code, stdout, stderr,
            )));
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a pipeline (list of commands connected by |).
    pub fn execute_pipeline_node(
        &self,
        state: &mut InterpreterState,
        pipeline: &PipelineNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut pipe_state = PipelineState::new();
        let pipe_stderr = pipeline.pipe_stderr.clone().unwrap_or_default();

        let options = PipelineOptions {
            pipefail: state.options.pipefail,
            lastpipe: state.shopt_options.lastpipe,
            runs_in_subshell: false,
            time_pipeline: pipeline.timed,
            time_posix_format: pipeline.time_posix,
        };

        // We need to pass state through the closure, but execute_pipeline
        // takes ownership of the closure. Use a RefCell pattern.
        use std::cell::RefCell;
        let state_cell = RefCell::new(state);

        let result = execute_pipeline(
            &mut pipe_state,
            &pipeline.commands,
            &pipe_stderr,
            &options,
            |cmd, stdin| {
                let state = &mut *state_cell.borrow_mut();
                self.execute_command(state, cmd, stdin)
            },
        )?;

        // Get state back
        let state = state_cell.into_inner();

        // Set PIPESTATUS
        set_pipestatus(&mut state.env, &result.exit_codes);

        let mut exec_result = result.to_exec_result();

        // Handle negation
        if pipeline.negated {
            exec_result.exit_code = if exec_result.exit_code == 0 { 1 } else { 0 };
        }

        Ok(exec_result)
    }

    /// Execute a single command.
    pub fn execute_command(
        &self,
        state: &mut InterpreterState,
        cmd: &CommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Check command limit
        if let Some(msg) = check_command_limit(state, self.limits) {
            return Err(InterpreterError::ExecutionLimit(
                crate::interpreter::errors::ExecutionLimitError::simple(
                    msg,
                    crate::interpreter::errors::LimitType::Commands,
                ),
            ));
        }

        match cmd {
            CommandNode::Simple(simple) => self.execute_simple_command(state, simple, stdin),
            CommandNode::Compound(compound) => {
                self.execute_compound_command(state, compound, stdin)
            }
            CommandNode::FunctionDef(func_def) => {
                let current_source = state.current_source.clone();
                execute_function_def(state, func_def, current_source.as_deref())
                    .map_err(InterpreterError::Exit)
            }
        }
    }

    /// Execute a simple command (name + args + redirections).
    pub fn execute_simple_command(
        &self,
        state: &mut InterpreterState,
        cmd: &SimpleCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Set line number for $LINENO
        if let Some(line) = cmd.line {
            state.current_line = line as u32;
        }

        let assignment_result = process_assignments(state, cmd, |state, word| {
            expand_word(state, word, Some(&self.substitution_runner())).value
        });

        if let Some(err) = assignment_result.error {
            return Ok(err);
        }

        // Name-less command: just a list of `VAR=value` assignments.
        let cmd_name = match &cmd.name {
            Some(word) => expand_word(state, word, Some(&self.substitution_runner())).value,
            None => {
                return Ok(ExecResult::new(
                    String::new(),
                    assignment_result.xtrace_output,
                    0,
                ));
            }
        };

        let mut args: Vec<String> = Vec::new();
        for arg in &cmd.args {
            let result = expand_word_with_glob(state, arg, Some(&self.substitution_runner()));
            if let Some(words) = result.split_words {
                args.extend(words);
            } else {
                args.push(result.value);
            }
        }

        // Prefix assignments (`FOO=bar cmd`) are visible to the command but
        // restored once it returns.
        let temp_assignments = assignment_result.temp_assignments;

        let result = self.dispatch_command(state, &cmd_name, &args, stdin);

        for (key, original) in temp_assignments {
            match original {
                Some(value) => {
                    state.env.insert(key, value);
                }
                None => {
                    state.env.remove(&key);
                }
            }
        }

        let result = result?;

        Ok(apply_redirections(
            state,
            self.fs,
            result,
            &cmd.redirections,
            None,
            |state, word| expand_word(state, word, Some(&self.substitution_runner())).value,
        ))
    }

    /// Resolve `name` through builtins, user-defined functions, and the
    /// external command registry, in that order.
    fn dispatch_command(
        &self,
        state: &mut InterpreterState,
        name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        self.dispatch_command_inner(state, name, args, stdin, false, false)
    }

    fn dispatch_command_inner(
        &self,
        state: &mut InterpreterState,
        name: &str,
        args: &[String],
        stdin: &str,
        skip_functions: bool,
        use_default_path: bool,
    ) -> Result<ExecResult, InterpreterError> {
        let exported_snapshot = build_exported_env(state);
        let build_exported_env_fn = move || exported_snapshot.clone();

        let run_command = |state: &mut InterpreterState,
                            name: &str,
                            args: &[String],
                            _quoted: &[bool],
                            stdin: &str,
                            skip_functions: bool,
                            use_default_path: bool,
                            _stdin_source_fd: i32|
         -> ExecResult {
            self.dispatch_command_inner(state, name, args, stdin, skip_functions, use_default_path)
                .unwrap_or_else(error_to_exec_result)
        };

        let execute_user_script = |state: &mut InterpreterState,
                                    name: &str,
                                    args: &[String],
                                    stdin: Option<&str>|
         -> ExecResult {
            self.call_user_function(state, name, args, stdin.unwrap_or(""))
                .unwrap_or_else(error_to_exec_result)
        };

        let mut ctx = BuiltinDispatchContext {
            state: &mut *state,
            fs: self.fs,
            run_command: &run_command,
            build_exported_env: &build_exported_env_fn,
            execute_user_script: &execute_user_script,
        };

        if let Some(result) =
            dispatch_builtin(&mut ctx, name, args, &[], stdin, skip_functions, use_default_path, -1)?
        {
            return Ok(result);
        }

        self.run_external(state, name, args, stdin)
    }

    /// Look up and call a user-defined shell function, running its body
    /// through the normal compound-command executor.
    fn call_user_function(
        &self,
        state: &mut InterpreterState,
        name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        let func = match get_function(state, name) {
            Some(f) => f.clone(),
            None => {
                return Ok(ExecResult::new(
                    String::new(),
                    format!("bash: {}: command not found\n", name),
                    127,
                ));
            }
        };

        let call_line = Some(state.current_line);
        call_function(
            state,
            &func,
            args,
            stdin,
            call_line,
            self.limits.max_recursion_depth,
            |state, stdin| self.execute_compound_command(state, &func.body, stdin),
        )
    }

    /// Run an external command from the registry, bridging into its async
    /// `execute` through the Tokio handle captured at construction time.
    fn run_external(
        &self,
        state: &mut InterpreterState,
        name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        let command = match self.registry.get(name) {
            Some(c) => c,
            None => {
                return Ok(ExecResult::new(
                    String::new(),
                    format!("bash: {}: command not found\n", name),
                    127,
                ));
            }
        };

        let ctx = CommandContext {
            args: args.to_vec(),
            stdin: stdin.to_string(),
            cwd: state.cwd.clone(),
            env: state.env.clone(),
            fs: self.async_fs.clone(),
            exec_fn: None,
            fetch_fn: None,
        };

        let result: CommandResult =
            tokio::task::block_in_place(|| self.handle.block_on(command.execute(ctx)));

        Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
    }

    /// Execute a compound command (if, for, while, etc.).
    pub fn execute_compound_command(
        &self,
        state: &mut InterpreterState,
        compound: &CompoundCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        match compound {
            CompoundCommandNode::If(if_node) => {
                // Build clauses for execute_if
                let clauses: Vec<(Vec<&StatementNode>, Vec<&StatementNode>)> = if_node
                    .clauses
                    .iter()
                    .map(|c| {
                        (
                            c.condition.iter().collect(),
                            c.body.iter().collect(),
                        )
                    })
                    .collect();

                let else_body: Option<Vec<&StatementNode>> =
                    if_node.else_body.as_ref().map(|b| b.iter().collect());

                let result = execute_if(
                    state,
                    &clauses,
                    else_body.as_deref(),
                    self.limits,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::For(for_node) => {
                // Expand words
                let mut words: Vec<String> = Vec::new();
                if let Some(ref word_list) = for_node.words {
                    for word in word_list {
                        let result = expand_word_with_glob(state, word, Some(&self.substitution_runner()));
                        if let Some(split) = result.split_words {
                            words.extend(split);
                        } else {
                            words.push(result.value);
                        }
                    }
                } else {
                    // Default to positional parameters
                    let argc: usize = state.env.get("#")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    for i in 1..=argc {
                        if let Some(val) = state.env.get(&i.to_string()) {
                            words.push(val.clone());
                        }
                    }
                }

                let body: Vec<&StatementNode> = for_node.body.iter().collect();

                let result = execute_for(
                    state,
                    &for_node.variable,
                    &words,
                    &body,
                    self.limits,
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::While(while_node) => {
                let condition: Vec<&StatementNode> = while_node.condition.iter().collect();
                let body: Vec<&StatementNode> = while_node.body.iter().collect();

                let result = execute_while(
                    state,
                    &condition,
                    &body,
                    self.limits,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Until(until_node) => {
                let condition: Vec<&StatementNode> = until_node.condition.iter().collect();
                let body: Vec<&StatementNode> = until_node.body.iter().collect();

                let result = execute_until(
                    state,
                    &condition,
                    &body,
                    self.limits,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Case(case_node) => {
                use crate::ast::types::CaseTerminator;
                use crate::interpreter::conditionals::match_pattern;
                use crate::interpreter::control_flow::run_body;

                let subject = expand_word(state, &case_node.word, Some(&self.substitution_runner())).value;

                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut idx = 0;
                let mut force_next = false;

                while idx < case_node.items.len() {
                    let item = &case_node.items[idx];

                    let matched = force_next
                        || item.patterns.iter().any(|p| {
                            let pattern = expand_word(state, p, Some(&self.substitution_runner())).value;
                            match_pattern(&subject, &pattern, state.shopt_options.nocasematch, state.shopt_options.extglob)
                        });

                    if matched {
                        let body: Vec<&StatementNode> = item.body.iter().collect();
                        let result = run_body(state, &body, self.limits, &mut |state, stmt| {
                            self.execute_statement(state, stmt)
                        })?;
                        stdout.push_str(&result.stdout);
                        stderr.push_str(&result.stderr);
                        exit_code = result.exit_code;

                        match item.terminator {
                            CaseTerminator::DoubleSemi => break,
                            CaseTerminator::SemiAnd => {
                                force_next = true;
                                idx += 1;
                                continue;
                            }
                            CaseTerminator::SemiSemiAnd => {
                                force_next = false;
                                idx += 1;
                                continue;
                            }
                        }
                    }

                    force_next = false;
                    idx += 1;
                }

                Ok(ExecResult::new(stdout, stderr, exit_code))
            }

            CompoundCommandNode::Subshell(subshell_node) => {
                execute_subshell(
                    state,
                    &subshell_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::Group(group_node) => {
                execute_group(
                    state,
                    &group_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::ArithmeticCommand(arith) => {
                use crate::interpreter::arithmetic::evaluate_arithmetic;
                use crate::interpreter::types::InterpreterContext;

                let mut ctx = InterpreterContext::new(state, self.limits);
                match evaluate_arithmetic(&mut ctx, &arith.expression.expression, false, None) {
                    Ok(value) => {
                        // Arithmetic command: exit 0 if non-zero, exit 1 if zero
                        let exit_code = if value != 0 { 0 } else { 1 };
                        Ok(ExecResult::new(String::new(), String::new(), exit_code))
                    }
                    Err(e) => {
                        Ok(ExecResult::new(
                            String::new(),
                            format!("bash: {}\n", e),
                            1,
                        ))
                    }
                }
            }

            CompoundCommandNode::ConditionalCommand(cond) => {
                use crate::interpreter::conditionals::evaluate_conditional_expression;

                let truthy = evaluate_conditional_expression(
                    state,
                    self.fs,
                    &cond.expression,
                    Some(&self.substitution_runner()),
                );
                Ok(ExecResult::new(String::new(), String::new(), if truthy { 0 } else { 1 }))
            }

            CompoundCommandNode::CStyleFor(cfor) => {
                use crate::interpreter::arithmetic::evaluate_arithmetic;
                use crate::interpreter::control_flow::run_body;
                use crate::interpreter::errors::{ExecutionLimitError, LimitType};
                use crate::interpreter::helpers::loop_helpers::{handle_loop_error, LoopAction};
                use crate::interpreter::types::InterpreterContext;

                if let Some(ref init) = cfor.init {
                    let mut ctx = InterpreterContext::new(state, self.limits);
                    if let Err(e) = evaluate_arithmetic(&mut ctx, &init.expression, false, None) {
                        return Ok(ExecResult::new(String::new(), format!("bash: {}\n", e), 1));
                    }
                }

                let body: Vec<&StatementNode> = cfor.body.iter().collect();

                let mut stdout = String::new();
                let mut stderr = String::new();
                let mut exit_code = 0;
                let mut iterations: u64 = 0;

                state.loop_depth += 1;
                let loop_depth = state.loop_depth;

                loop {
                    let keep_going = match &cfor.condition {
                        Some(cond) => {
                            let mut ctx = InterpreterContext::new(state, self.limits);
                            match evaluate_arithmetic(&mut ctx, &cond.expression, false, None) {
                                Ok(v) => v != 0,
                                Err(e) => {
                                    state.loop_depth -= 1;
                                    stderr.push_str(&format!("bash: {}\n", e));
                                    return Ok(ExecResult::new(stdout, stderr, 1));
                                }
                            }
                        }
                        None => true,
                    };

                    if !keep_going {
                        break;
                    }

                    iterations += 1;
                    if iterations > self.limits.max_iterations {
                        state.loop_depth -= 1;
                        return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                            format!("maximum loop iterations ({}) exceeded", self.limits.max_iterations),
                            LimitType::Iterations,
                            stdout,
                            stderr,
                        )));
                    }

                    match run_body(state, &body, self.limits, &mut |state, stmt| {
                        self.execute_statement(state, stmt)
                    }) {
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
                                }
                                LoopAction::Rethrow => {
                                    state.loop_depth -= 1;
                                    return Err(res.error.unwrap());
                                }
                                LoopAction::Error => {
                                    state.loop_depth -= 1;
                                    return Ok(ExecResult::new(
                                        res.stdout,
                                        res.stderr,
                                        res.exit_code.unwrap_or(1),
                                    ));
                                }
                            }
                        }
                    }

                    if let Some(ref update) = cfor.update {
                        let mut ctx = InterpreterContext::new(state, self.limits);
                        if let Err(e) = evaluate_arithmetic(&mut ctx, &update.expression, false, None) {
                            state.loop_depth -= 1;
                            stderr.push_str(&format!("bash: {}\n", e));
                            return Ok(ExecResult::new(stdout, stderr, 1));
                        }
                    }
                }

                state.loop_depth -= 1;
                Ok(ExecResult::new(stdout, stderr, exit_code))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
