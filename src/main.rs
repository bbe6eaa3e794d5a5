mod cli;

use clap::Parser;
use cli::{Cli, Command, ServiceArgs};
use mimalloc::MiMalloc;
use passvault::config::CONFIG;
use passvault::{Service, UserContext, Vault, VaultError};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    debug!(
        database_url = %cfg.database_url,
        loglevel = %cfg.loglevel,
        search_threshold = cfg.search_threshold
    );

    let cli = Cli::parse();
    let vault = Vault::open(cfg).await?;

    if let Command::Register = cli.command {
        let user = vault.users.create(&cli.login.user, &cli.login.password).await?;
        println!("registered {} (id {})", user.name, user.id);
        return Ok(());
    }

    let ctx = vault.users.login(&cli.login.user, &cli.login.password).await?;
    let outcome = run(&vault, &ctx, cli.command).await;
    vault.flush_audit().await?;
    outcome?;
    info!(user = %ctx.user.name, "done");
    Ok(())
}

async fn run(vault: &Vault, ctx: &UserContext, command: Command) -> Result<(), VaultError> {
    match command {
        Command::Register => {}
        Command::Add(args) => {
            let stored = vault.services.add(ctx, &to_service(ctx, args)).await?;
            println!("added {}", stored.name);
        }
        Command::Update { original, service } => {
            let stored = vault
                .services
                .update(ctx, &original, &to_service(ctx, service))
                .await?;
            println!("updated {}", stored.name);
        }
        Command::Show { name } => match vault.services.get(ctx, &name).await? {
            Some(s) => print_service(&s, true),
            None => return Err(VaultError::ServiceNotFound(name)),
        },
        Command::Search { pattern, tag } => {
            let hits = match tag {
                Some(tag) => vault.services.search_by_tag(ctx, &tag).await?,
                None => vault.services.search(ctx, &pattern).await?,
            };
            for s in &hits {
                print_service(s, false);
            }
        }
        Command::Delete { name } => {
            vault.services.delete(ctx, &name).await?;
            println!("deleted {name}");
        }
        Command::Tags { prune } => {
            if prune {
                let removed = vault.tags.delete_unused(ctx.user_id()).await?;
                println!("pruned {removed} unused tags");
            }
            for tag in vault.tags.list_with_counts(ctx.user_id()).await? {
                println!("{:<24} {}", tag.name, tag.count);
            }
        }
        Command::History { name } => {
            let events = match name {
                Some(name) => vault.history.list_for_service(ctx, &name).await?,
                None => vault.history.list(ctx).await?,
            };
            for e in events {
                println!(
                    "{}  {:<6}  {}  ({})",
                    e.action_date.format("%Y-%m-%d %H:%M:%S"),
                    e.action,
                    e.service.name,
                    e.service.username
                );
            }
        }
    }
    Ok(())
}

fn to_service(ctx: &UserContext, args: ServiceArgs) -> Service {
    Service::new(ctx.user_id(), args.name, args.username, args.secret)
        .with_note(args.note)
        .with_tags(args.tags)
}

fn print_service(s: &Service, reveal: bool) {
    let tags = s.tags.iter().cloned().collect::<Vec<_>>().join(", ");
    if reveal {
        println!("name:     {}", s.name);
        println!("username: {}", s.username);
        println!("password: {}", s.password);
        println!("note:     {}", s.note);
        println!("tags:     {tags}");
        println!("updated:  {}", s.last_update.to_rfc3339());
    } else {
        println!("{:<24} {:<24} {:.2}  [{tags}]", s.name, s.username, s.score);
    }
}
