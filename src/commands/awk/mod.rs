// src/commands/awk/mod.rs
pub mod builtins;
pub mod coercion;
pub mod context;
pub mod expressions;
pub mod fields;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod statements;
pub mod types;
pub mod variables;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::commands::{Command, CommandContext, CommandResult};
use self::context::AwkContext;
use self::interpreter::AwkInterpreter;
use self::parser::parse;
use self::types::{AwkExpr, AwkProgram, AwkStmt};

pub struct AwkCommand;

#[async_trait]
impl Command for AwkCommand {
    fn name(&self) -> &'static str {
        "awk"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.iter().any(|a| a == "--help") {
            return CommandResult::success(
                "Usage: awk [-F fs] [-v var=value] ['prog' | -f progfile] [file ...]\n\n\
                 Pattern scanning and text processing language.\n"
                    .to_string(),
            );
        }

        let mut field_sep: Option<String> = None;
        let mut assignments: Vec<(String, String)> = Vec::new();
        let mut prog_files: Vec<String> = Vec::new();
        let mut program_text: Option<String> = None;
        let mut files: Vec<String> = Vec::new();

        let args = &ctx.args;
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if arg == "-F" {
                if i + 1 < args.len() {
                    i += 1;
                    field_sep = Some(args[i].clone());
                }
            } else if let Some(rest) = arg.strip_prefix("-F") {
                if !rest.is_empty() {
                    field_sep = Some(rest.to_string());
                }
            } else if arg == "-v" {
                if i + 1 < args.len() {
                    i += 1;
                    if let Some((k, v)) = args[i].split_once('=') {
                        assignments.push((k.to_string(), v.to_string()));
                    }
                }
            } else if let Some(rest) = arg.strip_prefix("-v") {
                if !rest.is_empty() {
                    if let Some((k, v)) = rest.split_once('=') {
                        assignments.push((k.to_string(), v.to_string()));
                    }
                }
            } else if arg == "-f" {
                if i + 1 < args.len() {
                    i += 1;
                    prog_files.push(args[i].clone());
                }
            } else if arg.starts_with("--") {
                return CommandResult::error(format!("awk: unknown option: {}\n", arg));
            } else if arg == "-" {
                files.push(arg.clone());
            } else if arg.starts_with('-') && arg.len() > 1 {
                return CommandResult::error(format!("awk: unknown option: {}\n", arg));
            } else if program_text.is_none() && prog_files.is_empty() {
                program_text = Some(arg.clone());
            } else {
                files.push(arg.clone());
            }
            i += 1;
        }

        let source = if !prog_files.is_empty() {
            let mut combined = String::new();
            for pf in &prog_files {
                let path = ctx.fs.resolve_path(&ctx.cwd, pf);
                match ctx.fs.read_file(&path).await {
                    Ok(content) => {
                        if !combined.is_empty() {
                            combined.push('\n');
                        }
                        combined.push_str(&content);
                    }
                    Err(_) => {
                        return CommandResult::error(format!("awk: can't open file {}\n", pf));
                    }
                }
            }
            combined
        } else {
            match program_text {
                Some(p) => p,
                None => return CommandResult::error("awk: no program text\n".to_string()),
            }
        };

        let program: AwkProgram = match parse(&source) {
            Ok(p) => p,
            Err(e) => return CommandResult::error(format!("awk: syntax error: {}\n", e)),
        };

        let sep = field_sep.unwrap_or_else(|| " ".to_string());
        let mut awk_ctx = AwkContext::with_fs(&sep);
        awk_ctx.vfs = Some(ctx.fs.clone());
        awk_ctx.cwd = ctx.cwd.clone();
        awk_ctx.exec_fn = ctx.exec_fn.clone();
        awk_ctx.handle = Some(tokio::runtime::Handle::current());

        for (key, value) in &ctx.env {
            awk_ctx.environ.insert(key.clone(), value.clone());
        }
        awk_ctx.argv.insert("0".to_string(), "awk".to_string());
        for (idx, file) in files.iter().enumerate() {
            awk_ctx.argv.insert((idx + 1).to_string(), file.clone());
        }
        awk_ctx.argc = files.len() + 1;

        for (key, value) in &assignments {
            self::variables::set_variable(&mut awk_ctx, key, value);
        }

        // Pre-cache any files referenced by `getline < "literal"` so the
        // synchronous interpreter loop can serve them without awaiting.
        for filename in collect_getline_literal_files(&program) {
            let path = ctx.fs.resolve_path(&ctx.cwd, &filename);
            if let Ok(content) = ctx.fs.read_file(&path).await {
                awk_ctx.vars.insert(format!("__fc_{}", filename), content);
            }
        }

        let mut interp = AwkInterpreter::new(awk_ctx, program);
        interp.execute_begin();

        let runs_main_loop = interp.has_main_or_end_rules();

        if runs_main_loop && !interp.get_context().should_exit {
            if files.is_empty() {
                interp.get_context_mut().filename = String::new();
                for line in split_lines(&ctx.stdin) {
                    if interp.get_context().should_exit {
                        break;
                    }
                    interp.execute_line(&line);
                }
            } else {
                let mut stdin_consumed = false;
                'files: for file in &files {
                    if interp.get_context().should_exit {
                        break;
                    }
                    interp.get_context_mut().filename = file.clone();
                    interp.get_context_mut().fnr = 0;
                    interp.get_context_mut().should_next_file = false;

                    let content = if file == "-" {
                        if stdin_consumed {
                            String::new()
                        } else {
                            stdin_consumed = true;
                            ctx.stdin.clone()
                        }
                    } else {
                        let path = ctx.fs.resolve_path(&ctx.cwd, file);
                        match ctx.fs.read_file(&path).await {
                            Ok(c) => c,
                            Err(_) => {
                                return CommandResult::error(format!(
                                    "awk: can't open file {}\n",
                                    file
                                ));
                            }
                        }
                    };

                    for line in split_lines(&content) {
                        if interp.get_context().should_exit
                            || interp.get_context().should_next_file
                        {
                            continue 'files;
                        }
                        interp.execute_line(&line);
                    }
                }
            }
        }

        interp.execute_end();

        // Flush any output files and write-pipes that the program never
        // explicitly closed: files get written through the VFS, and each
        // distinct write-pipe command runs once with its buffered stdin.
        {
            let awk_ctx = interp.get_context_mut();
            let file_names: Vec<String> = awk_ctx.output_files.keys().cloned().collect();
            for name in file_names {
                if let Some(content) = awk_ctx.output_files.get(&name).cloned() {
                    awk_ctx.write_through_file(&name, &content);
                }
            }
            let pipe_names: Vec<String> = awk_ctx.pipe_write_buffers.keys().cloned().collect();
            for name in pipe_names {
                if let Some(buffered) = awk_ctx.pipe_write_buffers.remove(&name) {
                    let output = awk_ctx.run_pipe_command(&name, &buffered);
                    awk_ctx.output.push_str(&output);
                }
            }
        }

        CommandResult::with_exit_code(
            interp.get_output().to_string(),
            String::new(),
            interp.get_exit_code(),
        )
    }
}

fn split_lines(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = content.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines.into_iter().map(|s| s.to_string()).collect()
}

/// Walk an AWK program collecting every string-literal filename passed to
/// `getline < "file"`, so they can be read from the VFS up front.
fn collect_getline_literal_files(program: &AwkProgram) -> HashSet<String> {
    let mut files = HashSet::new();
    for rule in &program.rules {
        for stmt in &rule.action {
            collect_from_stmt(stmt, &mut files);
        }
    }
    for func in &program.functions {
        for stmt in &func.body {
            collect_from_stmt(stmt, &mut files);
        }
    }
    files
}

fn collect_from_stmt(stmt: &AwkStmt, files: &mut HashSet<String>) {
    match stmt {
        AwkStmt::ExprStmt(e) => collect_from_expr(e, files),
        AwkStmt::Print { args, output } => {
            for a in args {
                collect_from_expr(a, files);
            }
            if let Some(r) = output {
                collect_from_expr(&r.target, files);
            }
        }
        AwkStmt::Printf { format, args, output } => {
            collect_from_expr(format, files);
            for a in args {
                collect_from_expr(a, files);
            }
            if let Some(r) = output {
                collect_from_expr(&r.target, files);
            }
        }
        AwkStmt::If { condition, consequent, alternate } => {
            collect_from_expr(condition, files);
            collect_from_stmt(consequent, files);
            if let Some(alt) = alternate {
                collect_from_stmt(alt, files);
            }
        }
        AwkStmt::While { condition, body } => {
            collect_from_expr(condition, files);
            collect_from_stmt(body, files);
        }
        AwkStmt::DoWhile { body, condition } => {
            collect_from_expr(condition, files);
            collect_from_stmt(body, files);
        }
        AwkStmt::For { init, condition, update, body } => {
            if let Some(s) = init {
                collect_from_stmt(s, files);
            }
            if let Some(c) = condition {
                collect_from_expr(c, files);
            }
            if let Some(s) = update {
                collect_from_stmt(s, files);
            }
            collect_from_stmt(body, files);
        }
        AwkStmt::ForIn { body, .. } => collect_from_stmt(body, files),
        AwkStmt::Block(stmts) => {
            for s in stmts {
                collect_from_stmt(s, files);
            }
        }
        AwkStmt::Exit(Some(e)) | AwkStmt::Return(Some(e)) => collect_from_expr(e, files),
        AwkStmt::Delete { target } => collect_from_expr(target, files),
        _ => {}
    }
}

fn collect_from_expr(expr: &AwkExpr, files: &mut HashSet<String>) {
    match expr {
        AwkExpr::Getline { file: Some(f), .. } => {
            if let AwkExpr::StringLiteral(name) = f.as_ref() {
                files.insert(name.clone());
            }
            collect_from_expr(f, files);
        }
        AwkExpr::FieldRef(e)
        | AwkExpr::UnaryOp { operand: e, .. }
        | AwkExpr::PreIncrement(e)
        | AwkExpr::PreDecrement(e)
        | AwkExpr::PostIncrement(e)
        | AwkExpr::PostDecrement(e) => {
            collect_from_expr(e, files);
        }
        AwkExpr::BinaryOp { left, right, .. } | AwkExpr::Concatenation { left, right } => {
            collect_from_expr(left, files);
            collect_from_expr(right, files);
        }
        AwkExpr::Ternary { condition, consequent, alternate } => {
            collect_from_expr(condition, files);
            collect_from_expr(consequent, files);
            collect_from_expr(alternate, files);
        }
        AwkExpr::FunctionCall { args, .. } => {
            for a in args {
                collect_from_expr(a, files);
            }
        }
        AwkExpr::Assignment { target, value, .. } => {
            collect_from_expr(target, files);
            collect_from_expr(value, files);
        }
        AwkExpr::ArrayAccess { key, .. } => collect_from_expr(key, files),
        AwkExpr::InExpr { key, .. } => collect_from_expr(key, files),
        AwkExpr::Tuple(items) => {
            for item in items {
                collect_from_expr(item, files);
            }
        }
        AwkExpr::Getline { file: None, .. } => {}
        _ => {}
    }
}
