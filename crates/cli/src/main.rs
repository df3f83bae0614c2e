use clap::{Parser, Subcommand};
use coa_core::{
    ActivityLog, CertificateService, CoreConfig, JsonFileDirectory, JsonFileStore, TracingLog,
    UserAccount, UserDirectory,
};
use coa_render::{RenderAssets, TemplateVariant};
use coa_types::{NonEmptyText, Role};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "coa")]
#[command(about = "Certificate-of-analysis registry CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all certificate records
    List {
        /// Case-insensitive substring filter
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one record as JSON
    Show {
        /// Certificate code, NNNN-YYYY
        code: String,
    },
    /// Preview the next sequential code for the current year
    NextCode,
    /// Render a certificate to a PDF file
    Render {
        /// Certificate code, NNNN-YYYY
        code: String,
        /// Template variant: standard or partner
        #[arg(long, default_value = "standard")]
        variant: String,
        /// Output path
        #[arg(long, default_value = "certificado.pdf")]
        out: std::path::PathBuf,
    },
    /// List user accounts
    ListUsers,
    /// Add a user account
    AddUser {
        username: String,
        password_hash: String,
        /// administrator, supervisor or operator
        role: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = CoreConfig::from_env()?;
    let store = Arc::new(JsonFileStore::open(config.data_dir())?);
    let service = CertificateService::new(store, Arc::new(TracingLog::new()));

    match cli.command {
        Some(Commands::List { search }) => {
            let records = service.search(search.as_deref())?;
            if records.is_empty() {
                println!("No records found.");
            } else {
                for record in records {
                    println!(
                        "{} | {} | lote {} | {}",
                        record.code(),
                        record.get("PRODUCTO"),
                        record.get("LOTE"),
                        record.conclusion()
                    );
                }
            }
        }
        Some(Commands::Show { code }) => {
            let record = service.fetch(&code)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Some(Commands::NextCode) => {
            let code = service.next_code(chrono::Utc::now())?;
            println!("{code}");
        }
        Some(Commands::Render { code, variant, out }) => {
            let variant = TemplateVariant::parse(&variant)?;
            let record = service.fetch(&code)?;
            let assets = RenderAssets::load(config.font_dir(), config.logo_dir());
            let bytes = coa_render::render(&record, variant, &assets)?;
            std::fs::write(&out, &bytes)?;
            service
                .log()
                .append("cli", &format!("Generó PDF ({variant})"), &format!("Código: {code}"));
            println!("Wrote {} ({} bytes)", out.display(), bytes.len());
        }
        Some(Commands::ListUsers) => {
            let directory = JsonFileDirectory::open(config.data_dir())?;
            let accounts = directory.list()?;
            if accounts.is_empty() {
                println!("No users found.");
            } else {
                for account in accounts {
                    println!("{} ({})", account.username, account.role);
                }
            }
        }
        Some(Commands::AddUser {
            username,
            password_hash,
            role,
        }) => {
            let role = Role::parse(&role).ok_or(format!("unknown role: {role}"))?;
            let directory = JsonFileDirectory::open(config.data_dir())?;
            directory.create(UserAccount {
                username: NonEmptyText::new(&username)?,
                password_hash,
                role,
            })?;
            println!("Added user {username}");
        }
        None => {
            println!("Use 'coa --help' for commands");
        }
    }

    Ok(())
}
