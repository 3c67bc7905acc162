/// AWK Interpreter Orchestrator
///
/// Main interpreter struct that orchestrates AWK program execution,
/// handling BEGIN blocks, line processing, END blocks, and pattern matching.

use regex_lite::Regex;

use crate::commands::awk::coercion::is_truthy;
use crate::commands::awk::context::AwkContext;
use crate::commands::awk::expressions::eval_expr;
use crate::commands::awk::fields::set_current_line;
use crate::commands::awk::statements::execute_block;
use crate::commands::awk::types::{AwkPattern, AwkProgram};

/// The AWK interpreter orchestrator.
///
/// Manages program execution including BEGIN/END blocks, line processing,
/// pattern matching, and range pattern state tracking.
pub struct AwkInterpreter {
    pub ctx: AwkContext,
    program: AwkProgram,
    range_states: Vec<bool>, // One bool per rule for range pattern tracking
}

impl AwkInterpreter {
    /// Create a new interpreter with the given context and program.
    ///
    /// Initializes range states and registers user-defined functions.
    pub fn new(ctx: AwkContext, program: AwkProgram) -> Self {
        let mut interpreter = AwkInterpreter {
            range_states: vec![false; program.rules.len()],
            ctx,
            program,
        };

        // Register user-defined functions in context
        for func in &interpreter.program.functions {
            interpreter
                .ctx
                .functions
                .insert(func.name.clone(), func.clone());
        }

        interpreter
    }

    /// Execute all BEGIN rules.
    ///
    /// BEGIN rules run before any input is processed.
    pub fn execute_begin(&mut self) {
        for rule in &self.program.rules {
            if self.ctx.should_exit {
                break;
            }

            if matches!(rule.pattern, Some(AwkPattern::Begin)) {
                execute_block(&mut self.ctx, &rule.action, &self.program);
                // Reset should_next after BEGIN (BEGIN doesn't use next)
                self.ctx.should_next = false;
            }
        }
    }

    /// Process a single input line.
    ///
    /// Updates context with the new line, increments NR/FNR,
    /// and executes matching rules.
    pub fn execute_line(&mut self, line: &str) {
        if self.ctx.should_exit {
            return;
        }

        // Update context with new line
        set_current_line(&mut self.ctx, line);
        self.ctx.nr += 1;
        self.ctx.fnr += 1;

        // Process each rule by index to avoid borrow issues
        let num_rules = self.program.rules.len();
        for rule_index in 0..num_rules {
            if self.ctx.should_exit {
                break;
            }

            if self.ctx.should_next {
                self.ctx.should_next = false;
                break;
            }

            if self.ctx.should_next_file {
                break;
            }

            // Skip BEGIN/END rules
            let is_begin_or_end = matches!(
                self.program.rules[rule_index].pattern,
                Some(AwkPattern::Begin) | Some(AwkPattern::End)
            );
            if is_begin_or_end {
                continue;
            }

            if self.matches_rule_by_index(rule_index) {
                self.execute_rule_action_by_index(rule_index);
            }
        }

        // Reset should_next at end of line processing
        self.ctx.should_next = false;
    }

    /// Execute all END rules.
    ///
    /// END rules run after all input has been processed.
    /// If exit is called during an END block, further END blocks are skipped.
    pub fn execute_end(&mut self) {
        // If already in END block (recursive call), return
        if self.ctx.in_end_block {
            return;
        }

        self.ctx.in_end_block = true;
        // Reset should_exit so END blocks can execute, but preserve exit_code
        self.ctx.should_exit = false;

        for rule in &self.program.rules {
            if matches!(rule.pattern, Some(AwkPattern::End)) {
                execute_block(&mut self.ctx, &rule.action, &self.program);
                // exit from END block stops further END blocks
                if self.ctx.should_exit {
                    break;
                }
            }
        }

        self.ctx.in_end_block = false;
    }

    /// Whether the program has any rule other than BEGIN, i.e. whether
    /// input needs to be read at all. A BEGIN-only program (e.g. `awk
    /// 'BEGIN { print "hi" }'`) must not block on stdin.
    pub fn has_main_or_end_rules(&self) -> bool {
        self.program
            .rules
            .iter()
            .any(|r| !matches!(r.pattern, Some(AwkPattern::Begin)))
    }

    /// Get accumulated output.
    pub fn get_output(&self) -> &str {
        &self.ctx.output
    }

    /// Get exit code.
    pub fn get_exit_code(&self) -> i32 {
        self.ctx.exit_code
    }

    /// Get context reference.
    pub fn get_context(&self) -> &AwkContext {
        &self.ctx
    }

    /// Get mutable context reference.
    pub fn get_context_mut(&mut self) -> &mut AwkContext {
        &mut self.ctx
    }

    /// Check if a rule matches the current line (by index).
    fn matches_rule_by_index(&mut self, rule_index: usize) -> bool {
        // Clone the pattern to avoid borrow issues
        let pattern = self.program.rules[rule_index].pattern.clone();

        match pattern {
            None => true, // No pattern = matches all lines

            Some(AwkPattern::Begin) | Some(AwkPattern::End) => false,

            Some(AwkPattern::Regex(ref pat)) => {
                match Regex::new(pat) {
                    Ok(re) => re.is_match(&self.ctx.line),
                    Err(_) => false,
                }
            }

            Some(AwkPattern::Expression(ref expr)) => {
                let result = eval_expr(&mut self.ctx, expr, &self.program);
                is_truthy(&result)
            }

            Some(AwkPattern::Range { ref start, ref end }) => {
                self.match_range_pattern_cloned(start, end, rule_index)
            }
        }
    }

    /// Match a range pattern and update state (using cloned patterns).
    fn match_range_pattern_cloned(
        &mut self,
        start: &AwkPattern,
        end: &AwkPattern,
        rule_index: usize,
    ) -> bool {
        let start_matches = self.match_pattern(start);
        let end_matches = self.match_pattern(end);

        if !self.range_states[rule_index] {
            // Not currently in range
            if start_matches {
                self.range_states[rule_index] = true;
                // Check if end also matches same line (single-line range)
                if end_matches {
                    self.range_states[rule_index] = false;
                }
                return true;
            }
            false
        } else {
            // Currently in range - always matches
            if end_matches {
                self.range_states[rule_index] = false;
            }
            true
        }
    }

    /// Match a single pattern (used for range start/end).
    fn match_pattern(&mut self, pattern: &AwkPattern) -> bool {
        match pattern {
            AwkPattern::Regex(pat) => {
                match Regex::new(pat) {
                    Ok(re) => re.is_match(&self.ctx.line),
                    Err(_) => false,
                }
            }
            AwkPattern::Expression(expr) => {
                let result = eval_expr(&mut self.ctx, expr, &self.program);
                is_truthy(&result)
            }
            _ => false,
        }
    }

    /// Execute a rule's action (by index).
    ///
    /// If the rule has no action (empty action vec), the default is to print $0.
    fn execute_rule_action_by_index(&mut self, rule_index: usize) {
        let action_is_empty = self.program.rules[rule_index].action.is_empty();
        if action_is_empty {
            // Default action: print $0
            let line = self.ctx.line.clone();
            let ors = self.ctx.ors.clone();
            self.ctx.output.push_str(&line);
            self.ctx.output.push_str(&ors);
        } else {
            // Clone the action to avoid borrow issues
            let action = self.program.rules[rule_index].action.clone();
            execute_block(&mut self.ctx, &action, &self.program);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
