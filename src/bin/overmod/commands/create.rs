//! `overmod create` command

use std::path::Path;

use anyhow::Result;

use crate::cli::CreateArgs;
use crate::commands::context;
use crate::overrides::load_request;
use overmod::ops::create_environment_with_go;

pub fn execute(directory: Option<&Path>, args: CreateArgs) -> Result<()> {
    let ctx = context(directory)?;
    let request = load_request(ctx.cwd(), &args.input, &args.entries)?;

    let env = create_environment_with_go(&ctx, &request.entries, &request.overrides).map_err(
        |e| match e.root {
            Some(root) => anyhow::Error::new(e.source)
                .context(format!("workspace left at {}", root.display())),
            None => anyhow::Error::new(e.source),
        },
    )?;

    if args.json {
        let value = serde_json::json!({
            "root": env.root,
            "identity": env.identity,
            "entries": env.entries,
            "overridden": env.overridden,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", env.root.display());
        for entry in &env.entries {
            println!("{}", entry);
        }
    }

    Ok(())
}
