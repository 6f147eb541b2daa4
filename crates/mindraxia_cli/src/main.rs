//! `mindraxia` - serve the blog, run migrations, and manage authors.

mod cli;

use std::error::Error;
use std::fs;
use std::path::Path;

use clap::Parser;
use log::info;
use mindraxia_core::db::migrations::{current_version, latest_version};
use mindraxia_core::repo::author_repo::SqliteAuthorRepository;
use mindraxia_core::service::author_service::AuthorService;
use mindraxia_core::{init_logging, open_db, NoAnchorLookup, Renderer};
use mindraxia_server::Config;

use cli::{AuthorCommand, Cli, Command, ConfigCommand, RenderFormat};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::load_from(cli.config.as_deref())?;
    init_logging(&config.logging.level, &config.logging.dir)?;

    match cli.command {
        Command::Serve => handle_serve(&config),
        Command::Migrate => handle_migrate(&config),
        Command::Render { file, slug, format } => handle_render(&file, slug, format),
        Command::Author(cmd) => handle_author(&config, cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn handle_serve(config: &Config) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(mindraxia_server::serve(config))?;
    Ok(())
}

fn handle_migrate(config: &Config) -> Result<(), Box<dyn Error>> {
    let conn = open_db(&config.database.path)?;
    let version = current_version(&conn)?;
    info!(
        "event=cli_migrate module=cli status=ok schema_version={version} db_path={}",
        config.database.path.display()
    );
    println!(
        "{}: schema version {version} (latest {})",
        config.database.path.display(),
        latest_version()
    );
    Ok(())
}

fn handle_render(
    file: &Path,
    slug: Option<String>,
    format: RenderFormat,
) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(file)?;
    let mut renderer = Renderer::new(&NoAnchorLookup);
    if let Some(slug) = slug {
        renderer = renderer.with_post_slug(slug);
    }
    let rendered = renderer.render(&source);

    match format {
        RenderFormat::Html => {
            println!("{}", rendered.html);
            for diagnostic in &rendered.diagnostics {
                eprintln!("warning[{}]: {}", diagnostic.code, diagnostic.message);
            }
        }
        RenderFormat::Json => println!("{}", serde_json::to_string_pretty(&rendered)?),
    }
    Ok(())
}

fn handle_author(config: &Config, cmd: AuthorCommand) -> Result<(), Box<dyn Error>> {
    let conn = open_db(&config.database.path)?;
    let service = AuthorService::new(SqliteAuthorRepository::try_new(&conn)?);

    match cmd {
        AuthorCommand::Add { name, email, role } => {
            let issued = service.register_author(&name, &email, role.into())?;
            println!(
                "Registered {} <{}> as {}",
                issued.author.name,
                issued.author.email,
                issued.author.role.as_str()
            );
            println!("uuid:  {}", issued.author.uuid);
            println!("token: {}", issued.token);
            println!();
            println!("The token is shown only once. Store it now.");
        }
        AuthorCommand::List => {
            for author in service.list_authors()? {
                println!(
                    "{}  {:<6}  {} <{}>",
                    author.uuid,
                    author.role.as_str(),
                    author.name,
                    author.email
                );
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("[server]");
                println!("  bind:     {}", config.server.bind);
                println!("[database]");
                println!("  path:     {}", config.database.path.display());
                println!("[logging]");
                println!("  level:    {}", config.logging.level);
                println!("  dir:      {}", config.logging.dir.display());
                println!("[site]");
                println!("  title:    {}", config.site.title);
                println!("  base_url: {}", config.site.base_url);
            }
        }
    }
    Ok(())
}
