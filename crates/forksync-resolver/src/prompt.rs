//! Prompt construction and response cleanup

use std::fmt::Write;

use crate::chat::Message;

const SYSTEM_PROMPT: &str = "You resolve git merge conflicts. You receive one file \
that contains conflict markers, optionally with both sides of the merge. Produce the \
complete merged file, keeping the intent of both sides. Reply with the file content \
only: no explanation, no conflict markers.";

/// Inputs for resolving one file
#[derive(Debug, Clone, Copy)]
pub struct ConflictFile<'a> {
    pub path: &'a str,
    /// Working-tree content, including conflict markers
    pub merged: &'a str,
    /// The fork's version (`HEAD`), when readable
    pub ours: Option<&'a str>,
    /// The upstream version (`MERGE_HEAD`), when readable
    pub theirs: Option<&'a str>,
}

pub fn build_messages(file: &ConflictFile<'_>) -> Vec<Message> {
    let mut user = String::new();
    let _ = writeln!(user, "File: {}", file.path);
    let _ = writeln!(user);

    if let Some(ours) = file.ours {
        let _ = writeln!(user, "Fork version (ours):");
        push_block(&mut user, ours);
    }
    if let Some(theirs) = file.theirs {
        let _ = writeln!(user, "Upstream version (theirs):");
        push_block(&mut user, theirs);
    }

    let _ = writeln!(user, "Conflicted file:");
    push_block(&mut user, file.merged);
    let _ = write!(user, "Return the fully merged content of {}.", file.path);

    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}

fn push_block(out: &mut String, content: &str) {
    let _ = writeln!(out, "```");
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "```");
    let _ = writeln!(out);
}

/// Strip one surrounding Markdown code fence, if present.
///
/// A trailing newline is kept so files stay newline-terminated.
pub fn extract_content(response: &str) -> String {
    let trimmed = response.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            // Drop the info string (language tag) on the opening line
            let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
            rest.trim_end().strip_suffix("```").unwrap_or(rest)
        }
        None => trimmed,
    };

    let mut content = body.trim_end_matches(['\n', '\r']).to_string();
    content.push('\n');
    content
}

/// Whether `content` still has a line that opens, separates, or closes a
/// conflict hunk.
pub fn has_conflict_markers(content: &str) -> bool {
    content.lines().any(|line| {
        line.starts_with("<<<<<<< ")
            || line == "<<<<<<<"
            || line == "======="
            || line.starts_with(">>>>>>> ")
            || line == ">>>>>>>"
    })
}
