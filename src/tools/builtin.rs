//! Built-in coding tools.
//!
//! Provides the file and shell tools (`shell`, `read_file`, `create_file`,
//! `edit_file`, `list_directory`, `glob`, `grep`) a coding agent uses to work
//! inside its thread's working directory. Relative paths resolve against
//! [`ToolExecutionContext::working_dir`].
//!
//! ```rust,no_run
//! use skein::tools::builtin::coding_tools;
//!
//! let tools = coding_tools();
//! assert_eq!(tools.len(), 7);
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use regex::Regex;

use crate::error::SkeinError;
use crate::tools::registry::ToolSet;
use crate::tools::tool::{AgentTool, ExecutionMode, Tool, ToolExecutionContext};
use crate::tools::types::ToolParameters;

const SHELL_OUTPUT_MAX_BYTES: usize = 32_768;
const READ_FILE_MAX_BYTES: usize = 65_536;
const GREP_OUTPUT_MAX_BYTES: usize = 32_768;
const GREP_MAX_MATCHES: usize = 200;
const GLOB_MAX_RESULTS: usize = 500;
const SHELL_TIMEOUT: Duration = Duration::from_secs(30);

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let mut cutoff = max_bytes;
    while cutoff > 0 && !s.is_char_boundary(cutoff) {
        cutoff -= 1;
    }
    s[..cutoff].to_string()
}

fn tool_error(tool_name: &str, message: impl Into<String>) -> SkeinError {
    SkeinError::ToolExecution {
        tool_name: tool_name.into(),
        message: message.into(),
    }
}

/// Render `path` relative to `root` with forward slashes.
fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn walker(root: &Path) -> ignore::Walk {
    let mut builder = WalkBuilder::new(root);
    builder.hidden(true);
    builder.follow_links(false);
    builder.git_ignore(true);
    builder.git_exclude(true);
    builder.parents(true);
    builder.require_git(false);
    builder.build()
}

/// Compile a shell glob matched against `/`-separated relative paths.
///
/// `*` and `?` stay within one path component; `**`, `[...]` classes and
/// `{a,b}` alternation follow `globset` semantics.
pub(crate) fn compile_glob(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// Create the `shell` tool -- executes a shell command via `sh -c` in the
/// working directory.
///
/// Captures stdout and stderr, applies a 30-second timeout, and truncates
/// output beyond 32 KB.
pub fn shell_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "shell",
        "Execute a shell command in the working directory and return its output",
        ToolParameters::object()
            .string("command", "The shell command to execute", true)
            .build(),
        |args, ctx: ToolExecutionContext| async move {
            let command = args.get_str("command")?;

            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c").arg(command).kill_on_drop(true);
            if !ctx.working_dir.as_os_str().is_empty() {
                cmd.current_dir(&ctx.working_dir);
            }

            let output = match tokio::time::timeout(SHELL_TIMEOUT, cmd.output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => return Err(tool_error("shell", e.to_string())),
                Err(_) => {
                    return Err(tool_error(
                        "shell",
                        format!("command timed out after {}s", SHELL_TIMEOUT.as_secs()),
                    ))
                }
            };

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut combined = format!("{stdout}{stderr}");
            let truncated = combined.len() > SHELL_OUTPUT_MAX_BYTES;
            if truncated {
                combined = truncate_utf8(&combined, SHELL_OUTPUT_MAX_BYTES);
                combined.push_str("\n... (truncated)");
            }

            Ok(serde_json::json!({
                "exit_code": output.status.code(),
                "output": combined,
                "truncated": truncated,
            }))
        },
    ))
}

/// Create the `read_file` tool -- reads a file as UTF-8 text, capped at 64 KB.
pub fn read_file_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "read_file",
        "Read a file's contents as UTF-8 text",
        ToolParameters::object()
            .string("path", "Path to the file to read", true)
            .build(),
        |args, ctx: ToolExecutionContext| async move {
            let path = args.get_str("path")?;
            let content = tokio::fs::read_to_string(ctx.resolve(path))
                .await
                .map_err(|e| tool_error("read_file", format!("{path}: {e}")))?;

            let total_bytes = content.len();
            let truncated = total_bytes > READ_FILE_MAX_BYTES;
            let display = if truncated {
                let mut s = truncate_utf8(&content, READ_FILE_MAX_BYTES);
                s.push_str("\n... (truncated)");
                s
            } else {
                content
            };

            Ok(serde_json::json!({
                "content": display,
                "bytes": total_bytes,
                "truncated": truncated,
            }))
        },
    ))
}

/// Create the `create_file` tool.
///
/// Creates parent directories as needed. Refuses to clobber an existing file
/// unless `overwrite` is set.
pub fn create_file_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "create_file",
        "Create a file with the given content, creating parent directories if needed",
        ToolParameters::object()
            .string("path", "Path of the file to create", true)
            .string("content", "Content to write to the file", true)
            .boolean("overwrite", "Replace the file if it already exists", false)
            .default_value("overwrite", serde_json::json!(false))
            .build(),
        |args, ctx: ToolExecutionContext| async move {
            let path = args.get_str("path")?;
            let content = args.get_str("content")?;
            let overwrite = args.get_bool_opt("overwrite").unwrap_or(false);
            let target = ctx.resolve(path);

            if !overwrite && tokio::fs::try_exists(&target).await.unwrap_or(false) {
                return Err(tool_error(
                    "create_file",
                    format!("{path} already exists; pass overwrite=true to replace it"),
                ));
            }

            if let Some(parent) = target.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        tool_error(
                            "create_file",
                            format!("failed to create directories for {path}: {e}"),
                        )
                    })?;
                }
            }

            tokio::fs::write(&target, content)
                .await
                .map_err(|e| tool_error("create_file", format!("{path}: {e}")))?;

            Ok(serde_json::json!({
                "success": true,
                "path": path,
                "bytes_written": content.len(),
            }))
        },
    ))
}

/// Create the `edit_file` tool -- replaces exactly one occurrence of
/// `old_string` with `new_string`.
pub fn edit_file_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "edit_file",
        "Replace a unique snippet of text in a file",
        ToolParameters::object()
            .string("path", "Path of the file to edit", true)
            .string("old_string", "Exact text to replace; must occur exactly once", true)
            .string("new_string", "Replacement text", true)
            .build(),
        |args, ctx: ToolExecutionContext| async move {
            let path = args.get_str("path")?;
            let old = args.get_str("old_string")?;
            let new = args.get_str("new_string")?;
            if old.is_empty() {
                return Err(tool_error("edit_file", "old_string must not be empty"));
            }

            let target = ctx.resolve(path);
            let content = tokio::fs::read_to_string(&target)
                .await
                .map_err(|e| tool_error("edit_file", format!("{path}: {e}")))?;

            match content.matches(old).count() {
                0 => Err(tool_error("edit_file", format!("old_string not found in {path}"))),
                1 => {
                    let updated = content.replacen(old, new, 1);
                    tokio::fs::write(&target, &updated)
                        .await
                        .map_err(|e| tool_error("edit_file", format!("{path}: {e}")))?;
                    Ok(serde_json::json!({
                        "success": true,
                        "path": path,
                        "bytes": updated.len(),
                    }))
                }
                n => Err(tool_error(
                    "edit_file",
                    format!("old_string occurs {n} times in {path}; add surrounding context"),
                )),
            }
        },
    ))
}

/// Create the `list_directory` tool.
///
/// Returns a sorted array of entries, each with `name`, `type`
/// (`"file"` | `"dir"` | `"other"`), and `size` in bytes.
pub fn list_directory_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "list_directory",
        "List files and directories in a given path",
        ToolParameters::object()
            .string("path", "Directory to list (defaults to the working directory)", false)
            .default_value("path", serde_json::json!("."))
            .build(),
        |args, ctx: ToolExecutionContext| async move {
            let path = args.get_str_opt("path").unwrap_or(".");
            let dir = ctx.resolve(path);

            let mut read_dir = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| tool_error("list_directory", format!("{path}: {e}")))?;

            let mut entries = Vec::new();
            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| tool_error("list_directory", e.to_string()))?
            {
                let metadata = entry
                    .metadata()
                    .await
                    .map_err(|e| tool_error("list_directory", e.to_string()))?;

                let entry_type = if metadata.is_dir() {
                    "dir"
                } else if metadata.is_file() {
                    "file"
                } else {
                    "other"
                };

                entries.push((
                    entry.file_name().to_string_lossy().into_owned(),
                    entry_type,
                    metadata.len(),
                ));
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let count = entries.len();
            let entries: Vec<_> = entries
                .into_iter()
                .map(|(name, kind, size)| {
                    serde_json::json!({ "name": name, "type": kind, "size": size })
                })
                .collect();

            Ok(serde_json::json!({
                "path": path,
                "entries": entries,
                "count": count,
            }))
        },
    ))
}

/// Create the `glob` tool -- finds files whose relative path matches a
/// pattern such as `**/*.rs`. Honors `.gitignore`.
///
/// Walking is synchronous, so the tool runs in [`ExecutionMode::Sync`].
pub fn glob_tool() -> Arc<dyn Tool> {
    Arc::new(
        AgentTool::new(
            "glob",
            "Find files by glob pattern, e.g. `**/*.rs`",
            ToolParameters::object()
                .string("pattern", "Glob pattern relative to the search root", true)
                .string("path", "Search root (defaults to the working directory)", false)
                .build(),
            |args, ctx: ToolExecutionContext| async move {
                let pattern = args.get_str("pattern")?;
                let root = ctx.resolve(args.get_str_opt("path").unwrap_or("."));
                let matcher = compile_glob(pattern)
                    .map_err(|e| tool_error("glob", format!("invalid pattern {pattern}: {e}")))?;
                if !root.is_dir() {
                    return Err(tool_error(
                        "glob",
                        format!("{} is not a directory", root.display()),
                    ));
                }

                let mut files = Vec::new();
                for entry in walker(&root).flatten() {
                    if !entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }
                    let rel = display_relative(&root, entry.path());
                    if matcher.is_match(&rel) {
                        files.push(rel);
                    }
                }
                files.sort();
                let truncated = files.len() > GLOB_MAX_RESULTS;
                files.truncate(GLOB_MAX_RESULTS);

                Ok(serde_json::json!({
                    "count": files.len(),
                    "files": files,
                    "truncated": truncated,
                }))
            },
        )
        .with_mode(ExecutionMode::Sync),
    )
}

/// Create the `grep` tool -- regex search over file contents.
///
/// Output lines use `path:line:text`, capped at 200 matches and 32 KB.
pub fn grep_tool() -> Arc<dyn Tool> {
    Arc::new(
        AgentTool::new(
            "grep",
            "Search file contents with a regular expression",
            ToolParameters::object()
                .string("pattern", "Regular expression to search for", true)
                .string("path", "File or directory to search (defaults to '.')", false)
                .string("glob", "Only search files whose relative path matches", false)
                .build(),
            |args, ctx: ToolExecutionContext| async move {
                let pattern = args.get_str("pattern")?;
                let re = Regex::new(pattern)
                    .map_err(|e| tool_error("grep", format!("invalid pattern: {e}")))?;
                let filter = args
                    .get_str_opt("glob")
                    .map(compile_glob)
                    .transpose()
                    .map_err(|e| tool_error("grep", format!("invalid glob: {e}")))?;
                let root = ctx.resolve(args.get_str_opt("path").unwrap_or("."));
                let base = if root.is_file() {
                    root.parent().map(Path::to_path_buf).unwrap_or_default()
                } else {
                    root.clone()
                };

                let mut output = String::new();
                let mut matches = 0usize;
                'files: for entry in walker(&root).flatten() {
                    if !entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }
                    let rel = display_relative(&base, entry.path());
                    if filter.as_ref().is_some_and(|f| !f.is_match(&rel)) {
                        continue;
                    }
                    // Binary or unreadable files are skipped.
                    let Ok(content) = std::fs::read_to_string(entry.path()) else {
                        continue;
                    };
                    for (idx, line) in content.lines().enumerate() {
                        if re.is_match(line) {
                            output.push_str(&format!("{rel}:{}:{line}\n", idx + 1));
                            matches += 1;
                            if matches >= GREP_MAX_MATCHES {
                                break 'files;
                            }
                        }
                    }
                }

                let truncated =
                    matches >= GREP_MAX_MATCHES || output.len() > GREP_OUTPUT_MAX_BYTES;
                if output.len() > GREP_OUTPUT_MAX_BYTES {
                    output = truncate_utf8(&output, GREP_OUTPUT_MAX_BYTES);
                    output.push_str("\n... (truncated)");
                }

                Ok(serde_json::json!({
                    "matches": matches,
                    "output": output,
                    "truncated": truncated,
                }))
            },
        )
        .with_mode(ExecutionMode::Sync),
    )
}

/// Every built-in coding tool, in a stable order.
pub fn coding_tools() -> ToolSet {
    [
        shell_tool(),
        read_file_tool(),
        create_file_tool(),
        edit_file_tool(),
        list_directory_tool(),
        glob_tool(),
        grep_tool(),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::arguments::ToolArguments;

    fn ctx_in(dir: &Path) -> ToolExecutionContext {
        ToolExecutionContext::new(dir)
    }

    fn args(json: serde_json::Value) -> ToolArguments {
        ToolArguments::new(json)
    }

    #[test]
    fn coding_tools_have_expected_names() {
        let tools = coding_tools();
        assert_eq!(
            tools.names(),
            vec![
                "shell",
                "read_file",
                "create_file",
                "edit_file",
                "list_directory",
                "glob",
                "grep"
            ]
        );
        for tool in tools.iter() {
            assert_eq!(tool.parameters().schema["type"], "object");
            assert!(!tool.description().is_empty());
        }
    }

    #[test]
    fn truncate_utf8_never_splits_codepoints() {
        let s = "ab😀cd";
        assert_eq!(truncate_utf8(s, 2), "ab");
        assert_eq!(truncate_utf8(s, 3), "ab");
        assert_eq!(truncate_utf8(s, 5), "ab");
        assert_eq!(truncate_utf8(s, 6), "ab😀");
    }

    #[test]
    fn glob_matching_respects_separators() {
        let glob = compile_glob("**/*.rs").unwrap();
        assert!(glob.is_match("main.rs"));
        assert!(glob.is_match("src/tools/mod.rs"));
        assert!(!glob.is_match("src/mod.rsx"));

        let glob = compile_glob("src/*.{rs,toml}").unwrap();
        assert!(glob.is_match("src/lib.rs"));
        assert!(glob.is_match("src/Cargo.toml"));
        assert!(!glob.is_match("src/a/lib.rs"));

        assert!(compile_glob("file?.txt").unwrap().is_match("file1.txt"));
    }

    #[test]
    fn glob_supports_character_classes() {
        let glob = compile_glob("[ab].txt").unwrap();
        assert!(glob.is_match("a.txt"));
        assert!(glob.is_match("b.txt"));
        assert!(!glob.is_match("c.txt"));
        assert!(!glob.is_match("[ab].txt"));

        let glob = compile_glob("log[0-9]/[!.]*").unwrap();
        assert!(glob.is_match("log3/today"));
        assert!(!glob.is_match("log3/.hidden"));
        assert!(!glob.is_match("logx/today"));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(compile_glob("[unclosed").is_err());
    }

    #[tokio::test]
    async fn shell_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let result = shell_tool()
            .execute(&args(serde_json::json!({"command": "ls"})), &ctx_in(dir.path()))
            .await
            .unwrap();

        assert_eq!(result["exit_code"], 0);
        assert!(result["output"].as_str().unwrap().contains("marker.txt"));
    }

    #[tokio::test]
    async fn shell_returns_nonzero_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let result = shell_tool()
            .execute(&args(serde_json::json!({"command": "exit 42"})), &ctx_in(dir.path()))
            .await
            .unwrap();
        assert_eq!(result["exit_code"], 42);
    }

    #[tokio::test]
    async fn read_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world").unwrap();

        let result = read_file_tool()
            .execute(&args(serde_json::json!({"path": "hello.txt"})), &ctx_in(dir.path()))
            .await
            .unwrap();

        assert_eq!(result["content"], "hello world");
        assert_eq!(result["bytes"], 11);
        assert_eq!(result["truncated"], false);
    }

    #[tokio::test]
    async fn read_file_errors_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file_tool()
            .execute(&args(serde_json::json!({"path": "nope.txt"})), &ctx_in(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, SkeinError::ToolExecution { .. }));
    }

    #[tokio::test]
    async fn create_file_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let tool = create_file_tool();
        let ctx = ctx_in(dir.path());

        tool.execute(
            &args(serde_json::json!({"path": "a/b/c.txt", "content": "one"})),
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(),
            "one"
        );

        let err = tool
            .execute(
                &args(serde_json::json!({"path": "a/b/c.txt", "content": "two"})),
                &ctx,
            )
            .await;
        assert!(err.is_err());

        tool.execute(
            &args(serde_json::json!({"path": "a/b/c.txt", "content": "two", "overwrite": true})),
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(),
            "two"
        );
    }

    #[tokio::test]
    async fn edit_file_requires_unique_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "alpha beta alpha").unwrap();
        let tool = edit_file_tool();
        let ctx = ctx_in(dir.path());

        let err = tool
            .execute(
                &args(serde_json::json!({"path": "f.txt", "old_string": "alpha", "new_string": "x"})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("occurs 2 times"), "{err}");

        tool.execute(
            &args(serde_json::json!({"path": "f.txt", "old_string": "beta", "new_string": "gamma"})),
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "alpha gamma alpha"
        );
    }

    #[tokio::test]
    async fn list_directory_defaults_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zebra.txt"), "zz").unwrap();
        std::fs::write(dir.path().join("alpha.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let result = list_directory_tool()
            .execute(&args(serde_json::json!({})), &ctx_in(dir.path()))
            .await
            .unwrap();

        let names: Vec<&str> = result["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alpha.txt", "sub", "zebra.txt"]);
        assert_eq!(result["count"], 3);
        assert_eq!(result["entries"][1]["type"], "dir");
        assert_eq!(result["entries"][2]["size"], 2);
    }

    #[tokio::test]
    async fn glob_matches_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/nested/mod.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let result = glob_tool()
            .execute(&args(serde_json::json!({"pattern": "**/*.rs"})), &ctx_in(dir.path()))
            .await
            .unwrap();

        assert_eq!(
            result["files"],
            serde_json::json!(["src/lib.rs", "src/nested/mod.rs"])
        );
    }

    #[tokio::test]
    async fn glob_tool_expands_character_classes() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let result = glob_tool()
            .execute(&args(serde_json::json!({"pattern": "[ab].txt"})), &ctx_in(dir.path()))
            .await
            .unwrap();

        assert_eq!(result["files"], serde_json::json!(["a.txt", "b.txt"]));
    }

    #[tokio::test]
    async fn grep_reports_path_and_line() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello world\nfoo\nhello again\n").unwrap();
        std::fs::write(dir.path().join("b.md"), "hello markdown\n").unwrap();

        let result = grep_tool()
            .execute(
                &args(serde_json::json!({"pattern": "^hello", "glob": "*.txt"})),
                &ctx_in(dir.path()),
            )
            .await
            .unwrap();

        assert_eq!(result["matches"], 2);
        let output = result["output"].as_str().unwrap();
        assert!(output.contains("a.txt:1:hello world"));
        assert!(output.contains("a.txt:3:hello again"));
        assert!(!output.contains("b.md"));
    }

    #[tokio::test]
    async fn grep_rejects_invalid_regex() {
        let dir = tempfile::tempdir().unwrap();
        let result = grep_tool()
            .execute(&args(serde_json::json!({"pattern": "("})), &ctx_in(dir.path()))
            .await;
        assert!(result.is_err());
    }
}
