use std::path::{Path, PathBuf};

/// Shown when `USER` is not set.
const UNKNOWN_USER: &str = "?";

/// Render the prompt, e.g. `[@alice]:~/src$ `.
///
/// The working directory is abbreviated with `~` only when it is the home directory or
/// lies below it (compared by path components, so `/home/al` is not under `/home/a`).
pub fn render(user: Option<&str>, cwd: &Path, home: Option<&Path>) -> String {
    format!(
        "[@{}]:{}$ ",
        user.unwrap_or(UNKNOWN_USER),
        abbreviate_home(cwd, home).display()
    )
}

/// Replace a leading `home` in `cwd` with `~`.
pub fn abbreviate_home(cwd: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home.filter(|h| h.components().count() > 1) else {
        return cwd.to_path_buf();
    };
    match cwd.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => PathBuf::from("~"),
        Ok(rest) => Path::new("~").join(rest),
        Err(_) => cwd.to_path_buf(),
    }
}
