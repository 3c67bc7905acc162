//! Builtin Command Dispatch
//!
//! Handles dispatch of built-in shell commands like export, unset, cd, etc.
//! Separated from interpreter.rs for modularity. Every builtin with real
//! semantics lives under `interpreter::builtins`; this module is purely a
//! routing layer plus the handful of one-liners (`:`, `true`, `wait`) that
//! don't warrant their own file.

use std::collections::HashMap;
use crate::interpreter::types::{ExecResult, InterpreterState};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::interpreter::FileSystem as SyncFileSystem;
use crate::interpreter::helpers::result::{OK, failure, test_result};
use crate::interpreter::helpers::shell_constants::SHELL_BUILTINS;
use crate::interpreter::builtins::{
    self, BuiltinResult,
};

/// Type for the function that runs a command recursively. Takes `state`
/// explicitly rather than capturing it, so the closure can live alongside
/// `BuiltinDispatchContext::state` without aliasing it.
pub type RunCommandFn<'a> = &'a dyn Fn(
    &mut InterpreterState,
    &str,           // command_name
    &[String],      // args
    &[bool],        // quoted_args
    &str,           // stdin
    bool,           // skip_functions
    bool,           // use_default_path
    i32,            // stdin_source_fd
) -> ExecResult;

/// Type for the function that builds exported environment
pub type BuildExportedEnvFn<'a> = &'a dyn Fn() -> HashMap<String, String>;

/// Type for the function that executes user scripts
pub type ExecuteUserScriptFn<'a> = &'a dyn Fn(&mut InterpreterState, &str, &[String], Option<&str>) -> ExecResult;

/// Dispatch context containing dependencies needed for builtin dispatch
pub struct BuiltinDispatchContext<'a> {
    pub state: &'a mut InterpreterState,
    pub fs: &'a dyn SyncFileSystem,
    pub run_command: RunCommandFn<'a>,
    pub build_exported_env: BuildExportedEnvFn<'a>,
    pub execute_user_script: ExecuteUserScriptFn<'a>,
}

fn from_builtin(r: BuiltinResult) -> ExecResult {
    ExecResult::new(r.stdout, r.stderr, r.exit_code)
}

/// Dispatch a command to the appropriate builtin handler or external command.
/// `Ok(None)` means the command should fall through to external command
/// resolution (including the real `test`/`[` implementation in
/// `commands::test_cmd`, which is not duplicated here). `Err` carries a
/// control-flow event (break/continue/return/exit) that the caller must
/// propagate up to the nearest loop/function/script boundary.
pub fn dispatch_builtin(
    dispatch_ctx: &mut BuiltinDispatchContext,
    command_name: &str,
    args: &[String],
    _quoted_args: &[bool],
    stdin: &str,
    skip_functions: bool,
    _use_default_path: bool,
    stdin_source_fd: i32,
) -> Result<Option<ExecResult>, InterpreterError> {
    // Special builtins: cannot be overridden by functions, and several of
    // these signal control flow via Err rather than returning a result.
    match command_name {
        "export" => {
            return Ok(Some(from_builtin(builtins::handle_export(dispatch_ctx.state, args))));
        }
        "exit" => {
            return match builtins::handle_exit(dispatch_ctx.state, args) {
                Ok(infallible) => match infallible {},
                Err(e) => Err(e),
            };
        }
        "set" => {
            return builtins::handle_set(dispatch_ctx.state, args).map(|r| Some(from_builtin(r)));
        }
        "break" => {
            return builtins::handle_break(dispatch_ctx.state, args).map(|r| Some(from_builtin(r)));
        }
        "continue" => {
            return builtins::handle_continue(dispatch_ctx.state, args).map(|r| Some(from_builtin(r)));
        }
        "return" => {
            return builtins::handle_return(dispatch_ctx.state, args).map(|r| Some(from_builtin(r)));
        }
        "shift" => {
            return builtins::handle_shift(dispatch_ctx.state, args).map(|r| Some(from_builtin(r)));
        }
        "shopt" => {
            return Ok(Some(from_builtin(builtins::handle_shopt(dispatch_ctx.state, args))));
        }
        "help" => {
            return Ok(Some(from_builtin(builtins::handle_help(args))));
        }
        "cd" => {
            return Ok(Some(builtins::handle_cd(dispatch_ctx.state, args, dispatch_ctx.fs)));
        }
        "unset" => {
            return Ok(Some(builtins::handle_unset(dispatch_ctx.state, args)));
        }
        "declare" | "typeset" => {
            return Ok(Some(from_builtin(builtins::handle_declare(dispatch_ctx.state, args))));
        }
        "readonly" => {
            return Ok(Some(from_builtin(builtins::handle_readonly(dispatch_ctx.state, args))));
        }
        "local" => {
            return Ok(Some(builtins::handle_local(dispatch_ctx.state, args)));
        }
        "let" => {
            return Ok(Some(from_builtin(builtins::handle_let(dispatch_ctx.state, args))));
        }
        "read" => {
            return Ok(Some(from_builtin(builtins::handle_read(dispatch_ctx.state, args, stdin, stdin_source_fd))));
        }
        "getopts" => {
            return Ok(Some(from_builtin(builtins::handle_getopts(dispatch_ctx.state, args))));
        }
        "hash" => {
            return Ok(Some(from_builtin(builtins::handle_hash(dispatch_ctx.state, args))));
        }
        "mapfile" | "readarray" => {
            return Ok(Some(from_builtin(builtins::handle_mapfile(dispatch_ctx.state, args, stdin))));
        }
        "pushd" => {
            return Ok(Some(from_builtin(builtins::handle_pushd(dispatch_ctx.state, args))));
        }
        "popd" => {
            return Ok(Some(from_builtin(builtins::handle_popd(dispatch_ctx.state, args))));
        }
        "dirs" => {
            return Ok(Some(from_builtin(builtins::handle_dirs(dispatch_ctx.state, args))));
        }
        "compgen" => {
            return Ok(Some(from_builtin(builtins::handle_compgen(dispatch_ctx.state, args))));
        }
        "complete" => {
            return Ok(Some(from_builtin(builtins::handle_complete(dispatch_ctx.state, args))));
        }
        "compopt" => {
            return Ok(Some(from_builtin(builtins::handle_compopt(dispatch_ctx.state, args))));
        }
        _ => {}
    }

    // User-defined functions override most builtins (except special ones above).
    // The actual call is performed by the caller via `execute_user_script`
    // once it resolves the function body; we only signal "handled" here.
    if !skip_functions {
        if dispatch_ctx.state.functions.contains_key(command_name) {
            let execute_user_script = dispatch_ctx.execute_user_script;
            return Ok(Some(execute_user_script(dispatch_ctx.state, command_name, args, Some(stdin))));
        }
    }

    // Simple builtins (can be overridden by functions)
    match command_name {
        ":" | "true" => {
            return Ok(Some(OK));
        }
        "false" => {
            return Ok(Some(test_result(false)));
        }
        "command" => {
            return Ok(Some(handle_command_builtin(dispatch_ctx, args, stdin)));
        }
        "builtin" => {
            return Ok(Some(handle_builtin_builtin(dispatch_ctx, args, stdin)));
        }
        "exec" => {
            if args.is_empty() {
                return Ok(Some(OK));
            }
            let cmd = &args[0];
            let rest: Vec<String> = args[1..].to_vec();
            let run_command = dispatch_ctx.run_command;
            return Ok(Some(run_command(dispatch_ctx.state, cmd, &rest, &[], stdin, false, false, -1)));
        }
        "wait" => {
            return Ok(Some(OK));
        }
        _ => {}
    }

    // Return None to indicate command should be handled by external
    // resolution — this includes `test`/`[`, whose real implementation
    // (file tests, -a/-o combinators) lives in commands::test_cmd.
    Ok(None)
}

/// Handle the 'command' builtin
fn handle_command_builtin(
    dispatch_ctx: &mut BuiltinDispatchContext,
    args: &[String],
    stdin: &str,
) -> ExecResult {
    if args.is_empty() {
        return OK;
    }

    // Parse options
    let mut use_default_path = false;
    let mut verbose_describe = false;
    let mut show_path = false;
    let mut cmd_args = args.to_vec();

    while !cmd_args.is_empty() && cmd_args[0].starts_with('-') {
        let opt = &cmd_args[0];
        if opt == "--" {
            cmd_args.remove(0);
            break;
        }
        for ch in opt[1..].chars() {
            match ch {
                'p' => use_default_path = true,
                'V' => verbose_describe = true,
                'v' => show_path = true,
                _ => {}
            }
        }
        cmd_args.remove(0);
    }

    if cmd_args.is_empty() {
        return OK;
    }

    // Handle -v and -V: describe commands without executing
    if show_path || verbose_describe {
        return describe_commands(dispatch_ctx.state, &cmd_args, show_path, verbose_describe);
    }

    // Run command without checking functions
    let cmd = &cmd_args[0];
    let rest: Vec<String> = cmd_args[1..].to_vec();
    let run_command = dispatch_ctx.run_command;
    run_command(dispatch_ctx.state, cmd, &rest, &[], stdin, true, use_default_path, -1)
}

/// Handle the 'builtin' builtin
fn handle_builtin_builtin(
    dispatch_ctx: &mut BuiltinDispatchContext,
    args: &[String],
    stdin: &str,
) -> ExecResult {
    if args.is_empty() {
        return OK;
    }

    let mut cmd_args = args.to_vec();
    if cmd_args[0] == "--" {
        cmd_args.remove(0);
        if cmd_args.is_empty() {
            return OK;
        }
    }

    let cmd = &cmd_args[0];

    if !SHELL_BUILTINS.contains(cmd.as_str()) {
        return failure(format!("bash: builtin: {}: not a shell builtin\n", cmd));
    }

    let rest: Vec<String> = cmd_args[1..].to_vec();
    let run_command = dispatch_ctx.run_command;
    run_command(dispatch_ctx.state, cmd, &rest, &[], stdin, true, false, -1)
}

/// Describe commands for `command -v`/`command -V` without executing them.
fn describe_commands(
    state: &InterpreterState,
    names: &[String],
    show_path: bool,
    verbose_describe: bool,
) -> ExecResult {
    let mut stdout = String::new();
    let mut exit_code = 0;

    for name in names {
        if SHELL_BUILTINS.contains(name.as_str()) {
            if verbose_describe {
                stdout.push_str(&format!("{} is a shell builtin\n", name));
            } else {
                stdout.push_str(&format!("{}\n", name));
            }
        } else if state.functions.contains_key(name) {
            if verbose_describe {
                stdout.push_str(&format!("{} is a function\n", name));
            } else {
                stdout.push_str(&format!("{}\n", name));
            }
        } else {
            exit_code = 1;
        }
    }

    ExecResult::new(stdout, String::new(), exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::interpreter::interpreter::FileStat;

    /// A filesystem double that only knows "/" exists, for builtins tests
    /// that don't exercise file I/O directly.
    struct RootOnlyFs;
    impl SyncFileSystem for RootOnlyFs {
        fn read_file(&self, _path: &str) -> Result<String, std::io::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "not found"))
        }
        fn write_file(&self, _path: &str, _contents: &str) -> Result<(), std::io::Error> {
            Ok(())
        }
        fn append_file(&self, _path: &str, _contents: &str) -> Result<(), std::io::Error> {
            Ok(())
        }
        fn exists(&self, path: &str) -> bool {
            path == "/" || path == "/home/user"
        }
        fn is_dir(&self, path: &str) -> bool {
            path == "/" || path == "/home/user"
        }
        fn is_file(&self, _path: &str) -> bool {
            false
        }
        fn resolve_path(&self, base: &str, path: &str) -> String {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("{}/{}", base, path)
            }
        }
        fn stat(&self, _path: &str) -> Result<FileStat, std::io::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "not found"))
        }
        fn read_dir(&self, _path: &str) -> Result<Vec<String>, std::io::Error> {
            Ok(Vec::new())
        }
        fn glob(&self, _pattern: &str, _cwd: &str) -> Result<Vec<String>, std::io::Error> {
            Ok(Vec::new())
        }
    }

    fn no_run_command(_: &mut InterpreterState, _: &str, _: &[String], _: &[bool], _: &str, _: bool, _: bool, _: i32) -> ExecResult {
        failure("command not found\n")
    }
    fn no_exported_env() -> HashMap<String, String> {
        HashMap::new()
    }
    fn no_user_script(_: &mut InterpreterState, _: &str, _: &[String], _: Option<&str>) -> ExecResult {
        OK
    }

    fn dispatch(state: &mut InterpreterState, name: &str, args: &[String]) -> Result<Option<ExecResult>, InterpreterError> {
        let fs = RootOnlyFs;
        let mut ctx = BuiltinDispatchContext {
            state,
            fs: &fs,
            run_command: &no_run_command,
            build_exported_env: &no_exported_env,
            execute_user_script: &no_user_script,
        };
        dispatch_builtin(&mut ctx, name, args, &[], "", false, false, -1)
    }

    #[test]
    fn test_export_delegates_to_real_handler() {
        let mut state = InterpreterState::default();
        let result = dispatch(&mut state, "export", &["FOO=bar".to_string()]).unwrap().unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(state.env.get("FOO"), Some(&"bar".to_string()));
    }

    #[test]
    fn test_true_false() {
        let mut state = InterpreterState::default();
        assert_eq!(dispatch(&mut state, "true", &[]).unwrap().unwrap().exit_code, 0);
        assert_eq!(dispatch(&mut state, "false", &[]).unwrap().unwrap().exit_code, 1);
    }

    #[test]
    fn test_exit_signals_control_flow() {
        let mut state = InterpreterState::default();
        let result = dispatch(&mut state, "exit", &["3".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_break_outside_loop_fails() {
        let mut state = InterpreterState::default();
        let result = dispatch(&mut state, "break", &[]);
        assert!(result.is_err() || result.unwrap().unwrap().exit_code != 0);
    }

    #[test]
    fn test_unknown_command_falls_through() {
        let mut state = InterpreterState::default();
        let result = dispatch(&mut state, "definitely-not-a-builtin", &[]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_test_and_bracket_fall_through_to_external() {
        // Real semantics now live in commands::test_cmd; dispatch_builtin
        // must not shadow them.
        let mut state = InterpreterState::default();
        assert!(dispatch(&mut state, "test", &["-z".to_string(), "".to_string()]).unwrap().is_none());
        assert!(dispatch(&mut state, "[", &["-z".to_string(), "".to_string(), "]".to_string()]).unwrap().is_none());
    }

    #[test]
    fn test_cd_delegates_to_real_handler() {
        let mut state = InterpreterState::default();
        state.env.insert("HOME".to_string(), "/home/user".to_string());
        let result = dispatch(&mut state, "cd", &[]).unwrap().unwrap();
        assert_eq!(result.exit_code, 0);
    }
}
