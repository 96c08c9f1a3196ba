//! Profile command - update the signed-in user's profile

use anyhow::Result;

use adopta_core::Error;

use super::get_context;
use crate::output;

pub async fn run(name: Option<String>, phone: Option<String>, json: bool) -> Result<()> {
    let mut ctx = get_context().await?;

    // The whole profile is written back, so start from the current one
    let result = match ctx.snapshot().user {
        Some(mut data) => match data.id.clone() {
            Some(id) => {
                if name.is_some() {
                    data.name = name;
                }
                if phone.is_some() {
                    data.phone = phone;
                }
                ctx.update_user(data, &id).await
            }
            None => Err(Error::validation("session user has no subject id")),
        },
        None => Err(Error::NoActiveSession),
    };
    ctx.shutdown().await;

    output::report(json, result, |user| {
        output::success("Profile updated");
        println!("{}", output::user_table(user));
    })
}
