//! Output formatting utilities

use std::fmt;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use adopta_core::{OperationResult, Post, User};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Marker error: the failure was already printed, only the exit code is left
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failure already reported")
    }
}

impl std::error::Error for Reported {}

/// Print an operation outcome as JSON or through `human`
///
/// Failures become a non-zero exit code either way.
pub fn report<T: Serialize>(
    json: bool,
    result: adopta_core::domain::result::Result<T>,
    human: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if json {
        let failed = result.is_err();
        let outcome = OperationResult::from(result);
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return if failed { Err(Reported.into()) } else { Ok(()) };
    }

    match result {
        Ok(data) => {
            human(&data);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

/// Vertical key/value table for a user profile
pub fn user_table(user: &User) -> Table {
    let mut table = create_table();
    table.add_row(vec!["Email", user.email.as_str()]);
    table.add_row(vec!["Id", or_dash(user.id.as_deref())]);
    table.add_row(vec!["Name", or_dash(user.name.as_deref())]);
    table.add_row(vec!["Phone", or_dash(user.phone.as_deref())]);
    table
}

/// Vertical key/value table for a listing
pub fn post_table(post: &Post) -> Table {
    let adopted = if post.adotado {
        "yes".green().to_string()
    } else {
        "no".yellow().to_string()
    };

    let mut table = create_table();
    table.add_row(vec!["Id", or_dash(post.id.as_deref())]);
    table.add_row(vec!["Title", post.title.as_str()]);
    table.add_row(vec!["Name", post.name.as_str()]);
    table.add_row(vec!["Description", or_dash(Some(&post.description))]);
    table.add_row(vec!["Image", or_dash(Some(&post.image))]);
    table.add_row(vec!["Gender", or_dash(Some(&post.genero))]);
    table.add_row(vec!["Adopted", adopted.as_str()]);
    table.add_row(vec!["Owner", post.user_id.as_str()]);
    table
}
