//! One text file per item
//!
//! Files are named `{title}_[评论{count}条].txt` inside the output directory.
//! Two items with the same sanitized title overwrite each other; the last
//! write wins.

use std::path::{Path, PathBuf};
use tokio::fs;

/// Replaces path separators so a title is usable as a file name component
pub fn sanitize_title(title: &str) -> String {
    title.replace(['/', '\\'], "_")
}

/// File name for an item's comments
///
/// # Example
///
/// ```
/// use fang_comments::output::comment_file_name;
///
/// assert_eq!(comment_file_name("万科/城", 12), "万科_城_[评论12条].txt");
/// ```
pub fn comment_file_name(title: &str, count: u64) -> String {
    format!("{}_[评论{}条].txt", sanitize_title(title), count)
}

/// Writes all formatted comment lines of one item
///
/// The directory is created when missing; an existing file with the same
/// name is replaced. Returns the path that was written.
pub async fn write_comments(
    folder: &Path,
    title: &str,
    count: u64,
    lines: &[String],
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(folder).await?;

    let path = folder.join(comment_file_name(title, count));
    fs::write(&path, lines.concat()).await?;

    tracing::debug!("Wrote {} line(s) to {}", lines.len(), path.display());
    Ok(path)
}
