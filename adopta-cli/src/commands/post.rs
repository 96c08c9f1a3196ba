//! Post commands - create, show, edit, remove and adopt listings

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;

use adopta_core::{Error, PostDraft, PostPatch};

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum PostCommands {
    /// Create a listing owned by the signed-in user
    New {
        /// Listing title
        title: String,
        /// Animal name
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Image URL
        #[arg(long, default_value = "")]
        image: String,
        /// Gender / category tag
        #[arg(long, default_value = "")]
        genero: String,
    },
    /// Show one listing
    Show {
        /// Listing id
        id: String,
    },
    /// Change fields of a listing; unset options are left as they are
    Edit {
        /// Listing id
        id: String,
        #[command(flatten)]
        fields: EditFields,
    },
    /// Delete a listing
    Rm {
        /// Listing id
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Mark a listing as adopted
    Adopt {
        /// Listing id
        id: String,
    },
}

#[derive(Args)]
pub struct EditFields {
    #[arg(long)]
    title: Option<String>,
    /// Animal name
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Image URL
    #[arg(long)]
    image: Option<String>,
    /// Gender / category tag
    #[arg(long)]
    genero: Option<String>,
}

impl From<EditFields> for PostPatch {
    fn from(fields: EditFields) -> Self {
        PostPatch {
            title: fields.title,
            name: fields.name,
            description: fields.description,
            image: fields.image,
            genero: fields.genero,
            adotado: None,
        }
    }
}

pub async fn run(command: PostCommands, json: bool) -> Result<()> {
    if let PostCommands::Rm { id, force: false } = &command {
        if !json && !confirm_removal(id)? {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let mut ctx = get_context().await?;
    let outcome = match command {
        PostCommands::New {
            title,
            name,
            description,
            image,
            genero,
        } => {
            let draft = PostDraft {
                description,
                image,
                genero,
                ..PostDraft::new(title, name)
            };
            let result = ctx.create_post(draft).await;
            output::report(json, result, |id| {
                output::success(&format!("Listing created: {}", id));
            })
        }
        PostCommands::Show { id } => {
            let result = ctx.fetch_post(&id).await;
            output::report(json, result, |post| println!("{}", output::post_table(post)))
        }
        PostCommands::Edit { id, fields } => {
            let patch = PostPatch::from(fields);
            let result = if patch.is_empty() {
                Err(Error::validation("nothing to change; pass at least one field option"))
            } else {
                ctx.edit_post(&id, patch).await
            };
            output::report(json, result, |_| output::success(&format!("Listing {} updated", id)))
        }
        PostCommands::Rm { id, .. } => {
            let result = ctx.delete_post(&id).await;
            output::report(json, result, |_| output::success(&format!("Listing {} removed", id)))
        }
        PostCommands::Adopt { id } => {
            let result = ctx.mark_as_adopted(&id).await;
            output::report(json, result, |_| {
                output::success(&format!("Listing {} marked as adopted", id));
            })
        }
    };
    ctx.shutdown().await;
    outcome
}

fn confirm_removal(id: &str) -> Result<bool> {
    println!("\n{}", format!("This will permanently delete listing '{}'.", id).yellow());
    Ok(Confirm::new()
        .with_prompt("Are you sure?")
        .default(false)
        .interact()?)
}
