//! Archive file naming

use std::fs;
use std::io;
use std::path::Path;

/// Replace characters that are awkward or invalid in file names
///
/// Characters with a full-width equivalent keep their meaning (`?` → `？`);
/// separators and quotes become `_`; newlines are dropped.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '?' => out.push('？'),
            '!' => out.push('！'),
            '*' => out.push('＊'),
            '&' => out.push('＆'),
            ':' => out.push('：'),
            ';' => out.push('；'),
            '<' => out.push('＜'),
            '>' => out.push('＞'),
            ')' => out.push('）'),
            '+' => out.push('＋'),
            ' ' | '\u{3000}' | '\\' | '/' | '"' | '\'' | '|' | '(' => out.push('_'),
            '\n' | '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Create the parent directory of `file` if it is missing
pub fn ensure_parent_dir(file: &Path) -> io::Result<()> {
    let Some(dir) = file.parent() else {
        return Ok(());
    };
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
    }
}
