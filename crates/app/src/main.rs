use std::error::Error;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{
    CategoryUpdate, CreateTransactionCmd, Engine, NewAccount, NewCategory, NewCreditCardInfo,
    Scope, TransactionKind, TransactionListFilter, TransactionService, UpdateTransactionCmd,
    calculate_installments,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use uuid::Uuid;

mod settings;

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "fintrack")]
#[command(about = "Personal finance ledger: accounts, categories, tags and installment transactions")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`). Overrides
    /// the `database` section of the settings.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Tenant the command acts on.
    #[arg(long, env = "FINTRACK_TENANT", global = true)]
    tenant: Option<Uuid>,

    /// Acting user, recorded on every write.
    #[arg(long, env = "FINTRACK_USER", global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Tenant(Tenant),
    Account(Account),
    Category(Category),
    Tag(Tag),
    Transaction(Transaction),
    Installments(Installments),
}

#[derive(Args, Debug)]
struct Tenant {
    #[command(subcommand)]
    command: TenantCommand,
}

#[derive(Subcommand, Debug)]
enum TenantCommand {
    /// Creates a tenant with the acting user as its first member.
    Create {
        #[arg(long)]
        name: String,
    },
    /// Tenants the acting user belongs to.
    List,
    AddMember {
        #[arg(long)]
        member: String,
    },
    RemoveMember {
        #[arg(long)]
        member: String,
    },
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    /// Replaces every editable field of an account.
    Update {
        #[arg(long)]
        id: Uuid,
        #[command(flatten)]
        fields: AccountCreateArgs,
    },
    List,
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Shows the card details of a credit-card account.
    CardShow {
        #[arg(long)]
        id: Uuid,
    },
    /// Sets the card details of a credit-card account.
    CardSet(CardSetArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    currency: String,
    /// bank, cash, credit_card, investment or other.
    #[arg(long)]
    kind: String,
    #[arg(long, default_value_t = 0.0)]
    initial_balance: f64,
    #[arg(long, default_value = "#607d8b")]
    color: String,
    #[arg(long, default_value = "")]
    icon: String,
}

impl From<&AccountCreateArgs> for NewAccount {
    fn from(args: &AccountCreateArgs) -> Self {
        NewAccount {
            name: args.name.clone(),
            initial_balance: args.initial_balance,
            currency: args.currency.clone(),
            color: args.color.clone(),
            icon: args.icon.clone(),
            kind: args.kind.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct CardSetArgs {
    /// Credit-card account.
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    last_four: String,
    /// Name printed on the card.
    #[arg(long)]
    name: String,
    /// visa, mastercard, amex, discover, jcb, unionpay, diners_club, maestro
    /// or unknown.
    #[arg(long)]
    brand: String,
    #[arg(long, value_parser = parse_date)]
    closing_date: DateTime<Utc>,
    #[arg(long, value_parser = parse_date)]
    due_date: DateTime<Utc>,
}

#[derive(Args, Debug)]
struct Category {
    #[command(subcommand)]
    command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Create(CategoryCreateArgs),
    /// Renames or moves a category. Its type cannot change.
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        parent: Option<Uuid>,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long, default_value = "")]
        icon: String,
    },
    List,
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct CategoryCreateArgs {
    #[arg(long)]
    name: String,
    /// income, expense or transfer.
    #[arg(long)]
    kind: String,
    #[arg(long)]
    parent: Option<Uuid>,
    #[arg(long, default_value = "")]
    color: String,
    #[arg(long, default_value = "")]
    icon: String,
}

#[derive(Args, Debug)]
struct Tag {
    #[command(subcommand)]
    command: TagCommand,
}

#[derive(Subcommand, Debug)]
enum TagCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        name: String,
    },
    List,
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct Transaction {
    #[command(subcommand)]
    command: TransactionCommand,
}

#[derive(Subcommand, Debug)]
enum TransactionCommand {
    Create(TransactionCreateArgs),
    Update(TransactionUpdateArgs),
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    List {
        #[arg(long)]
        accrual_month: Option<String>,
        #[arg(long)]
        account: Option<Uuid>,
        #[arg(long, value_parser = parse_kind)]
        kind: Option<TransactionKind>,
    },
    /// Show a transaction with its tags.
    Show {
        #[arg(long)]
        id: Uuid,
    },
    /// Show the installment group a transaction belongs to.
    Group {
        #[arg(long)]
        id: Uuid,
    },
    /// Replace the tags of a transaction. No `--tag` clears them.
    Tags {
        #[arg(long)]
        id: Uuid,
        #[arg(long = "tag")]
        tags: Vec<Uuid>,
    },
}

#[derive(Args, Debug)]
struct TransactionCreateArgs {
    #[arg(long)]
    from_account: Uuid,
    #[arg(long)]
    to_account: Option<Uuid>,
    #[arg(long)]
    category: Uuid,
    /// credit, debit, transfer or payment.
    #[arg(long, value_parser = parse_kind)]
    kind: TransactionKind,
    #[arg(long)]
    amount: f64,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    #[arg(long, value_parser = parse_date)]
    due_date: DateTime<Utc>,
    #[arg(long, value_parser = parse_date)]
    payment_date: Option<DateTime<Utc>>,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    accrual_month: Option<String>,
    #[arg(long)]
    comments: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<Uuid>,
    #[arg(long, default_value_t = 1)]
    installments: u32,
    /// Repeat the full amount on every installment instead of splitting it.
    #[arg(long)]
    recurring: bool,
}

#[derive(Args, Debug)]
struct TransactionUpdateArgs {
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    from_account: Option<Uuid>,
    #[arg(long, conflicts_with = "clear_to_account")]
    to_account: Option<Uuid>,
    #[arg(long)]
    clear_to_account: bool,
    #[arg(long)]
    category: Option<Uuid>,
    #[arg(long, value_parser = parse_kind)]
    kind: Option<TransactionKind>,
    #[arg(long)]
    amount: Option<f64>,
    #[arg(long, value_parser = parse_date)]
    due_date: Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_payment_date")]
    payment_date: Option<DateTime<Utc>>,
    #[arg(long)]
    clear_payment_date: bool,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    accrual_month: Option<String>,
    #[arg(long, conflicts_with = "clear_comments")]
    comments: Option<String>,
    #[arg(long)]
    clear_comments: bool,
    #[arg(long = "tag", conflicts_with = "clear_tags")]
    tags: Vec<Uuid>,
    #[arg(long)]
    clear_tags: bool,
}

#[derive(Args, Debug)]
struct Installments {
    #[command(subcommand)]
    command: InstallmentsCommand,
}

#[derive(Subcommand, Debug)]
enum InstallmentsCommand {
    /// Print an installment plan without touching the database.
    Preview {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        count: u32,
        #[arg(long, value_parser = parse_date)]
        due_date: DateTime<Utc>,
        #[arg(long)]
        recurring: bool,
    },
}

fn parse_kind(raw: &str) -> Result<TransactionKind, String> {
    TransactionKind::try_from(raw).map_err(|_| format!("invalid transaction type: {raw}"))
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date: {raw}"))
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Cli {
    fn tenant(&self) -> AppResult<Uuid> {
        self.tenant
            .ok_or_else(|| "--tenant (or FINTRACK_TENANT) is required".into())
    }

    fn user(&self) -> &str {
        self.user.as_deref().unwrap_or_default()
    }

    fn scope(&self) -> AppResult<Scope> {
        Ok(Scope::new(self.tenant()?, self.user()))
    }
}

async fn connect(url: &str) -> AppResult<Engine> {
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(Engine::builder().database(database).build().await?)
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fintrack={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    if let Command::Installments(Installments {
        command:
            InstallmentsCommand::Preview {
                amount,
                count,
                due_date,
                recurring,
            },
    }) = &cli.command
    {
        return print_json(&calculate_installments(
            *amount, *count, *due_date, *recurring,
        )?);
    }

    let url = cli
        .database_url
        .clone()
        .or_else(|| settings.database.as_ref().map(settings::Database::url))
        .unwrap_or_else(|| "sqlite:./fintrack.db?mode=rwc".to_string());
    tracing::debug!("using database {url}");
    let service = TransactionService::new(connect(&url).await?);

    run(&cli, &service).await
}

async fn run(cli: &Cli, service: &TransactionService<Engine>) -> AppResult<()> {
    let engine = service.store();
    match &cli.command {
        Command::Tenant(Tenant { command }) => match command {
            TenantCommand::Create { name } => {
                print_json(&engine.new_tenant(name, cli.user()).await?)
            }
            TenantCommand::List => print_json(&engine.list_user_tenants(cli.user()).await?),
            TenantCommand::AddMember { member } => {
                print_json(&engine.add_tenant_member(cli.tenant()?, member).await?)
            }
            TenantCommand::RemoveMember { member } => {
                engine.remove_tenant_member(cli.tenant()?, member).await?;
                print_json(&serde_json::json!({ "removed": member }))
            }
        },

        Command::Account(Account { command }) => {
            let tenant_id = cli.tenant()?;
            match command {
                AccountCommand::Create(args) => {
                    let account = NewAccount::from(args);
                    print_json(&engine.new_account(tenant_id, cli.user(), &account).await?)
                }
                AccountCommand::Update { id, fields } => {
                    let account = NewAccount::from(fields);
                    print_json(
                        &engine
                            .update_account(tenant_id, cli.user(), *id, &account)
                            .await?,
                    )
                }
                AccountCommand::List => print_json(&engine.list_accounts(tenant_id).await?),
                AccountCommand::Delete { id } => {
                    engine.delete_account(tenant_id, *id, cli.user()).await?;
                    print_json(&serde_json::json!({ "deleted": id }))
                }
                AccountCommand::CardShow { id } => {
                    print_json(&engine.credit_card_info(tenant_id, *id).await?)
                }
                AccountCommand::CardSet(args) => {
                    let info = NewCreditCardInfo {
                        last_four: args.last_four.clone(),
                        name: args.name.clone(),
                        brand: args.brand.clone(),
                        closing_date: Some(args.closing_date),
                        due_date: Some(args.due_date),
                    };
                    print_json(
                        &engine
                            .upsert_credit_card_info(tenant_id, cli.user(), args.id, &info)
                            .await?,
                    )
                }
            }
        }

        Command::Category(Category { command }) => {
            let tenant_id = cli.tenant()?;
            match command {
                CategoryCommand::Create(args) => {
                    let category = NewCategory {
                        name: args.name.clone(),
                        kind: args.kind.clone(),
                        parent_category_id: args.parent,
                        color: args.color.clone(),
                        icon: args.icon.clone(),
                    };
                    print_json(&engine.new_category(tenant_id, cli.user(), &category).await?)
                }
                CategoryCommand::Update {
                    id,
                    name,
                    parent,
                    color,
                    icon,
                } => {
                    let update = CategoryUpdate {
                        name: name.clone(),
                        parent_category_id: *parent,
                        color: color.clone(),
                        icon: icon.clone(),
                    };
                    print_json(
                        &engine
                            .update_category(tenant_id, cli.user(), *id, &update)
                            .await?,
                    )
                }
                CategoryCommand::List => print_json(&engine.list_categories(tenant_id).await?),
                CategoryCommand::Delete { id } => {
                    engine.delete_category(tenant_id, *id, cli.user()).await?;
                    print_json(&serde_json::json!({ "deleted": id }))
                }
            }
        }

        Command::Tag(Tag { command }) => {
            let tenant_id = cli.tenant()?;
            match command {
                TagCommand::Create { name } => {
                    print_json(&engine.new_tag(tenant_id, cli.user(), name).await?)
                }
                TagCommand::Update { id, name } => {
                    print_json(&engine.update_tag(tenant_id, cli.user(), *id, name).await?)
                }
                TagCommand::List => print_json(&engine.list_tags(tenant_id).await?),
                TagCommand::Delete { id } => {
                    engine.delete_tag(tenant_id, *id, cli.user()).await?;
                    print_json(&serde_json::json!({ "deleted": id }))
                }
            }
        }

        Command::Transaction(Transaction { command }) => {
            let scope = cli.scope()?;
            run_transaction(service, &scope, command).await
        }

        Command::Installments(_) => Ok(()),
    }
}

async fn run_transaction(
    service: &TransactionService<Engine>,
    scope: &Scope,
    command: &TransactionCommand,
) -> AppResult<()> {
    match command {
        TransactionCommand::Create(args) => {
            let mut cmd = CreateTransactionCmd::new(
                args.from_account,
                args.category,
                args.kind,
                args.amount,
                args.due_date,
            )
            .tag_ids(args.tags.clone())
            .installments(args.installments)
            .recurring(args.recurring);
            cmd.to_account_id = args.to_account;
            cmd.currency = args.currency.clone();
            cmd.accrual_month = args.accrual_month.clone();
            cmd.comments = args.comments.clone();
            cmd.payment_date = args.payment_date;
            print_json(&service.create(scope, cmd).await?)
        }
        TransactionCommand::Update(args) => {
            let cmd = UpdateTransactionCmd {
                transaction_id: args.id,
                from_account_id: args.from_account,
                to_account_id: nullable(args.to_account, args.clear_to_account),
                amount: args.amount,
                currency: args.currency.clone(),
                accrual_month: args.accrual_month.clone(),
                kind: args.kind,
                category_id: args.category,
                comments: nullable(args.comments.clone(), args.clear_comments),
                due_date: args.due_date,
                payment_date: nullable(args.payment_date, args.clear_payment_date),
                tag_ids: if args.clear_tags {
                    Some(Vec::new())
                } else if args.tags.is_empty() {
                    None
                } else {
                    Some(args.tags.clone())
                },
            };
            print_json(&service.update(scope, cmd).await?)
        }
        TransactionCommand::Delete { id } => {
            service.delete(scope, *id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        TransactionCommand::List {
            accrual_month,
            account,
            kind,
        } => {
            let filter = TransactionListFilter {
                accrual_month: accrual_month.clone(),
                account_id: *account,
                kind: *kind,
            };
            print_json(&service.list(scope, &filter).await?)
        }
        TransactionCommand::Show { id } => {
            let transaction = service.get(scope, *id).await?;
            let tags = service.tags(scope, *id).await?;
            print_json(&serde_json::json!({ "transaction": transaction, "tags": tags }))
        }
        TransactionCommand::Group { id } => print_json(&service.installment_group(scope, *id).await?),
        TransactionCommand::Tags { id, tags } => {
            service.replace_tags(scope, *id, tags.clone()).await?;
            print_json(&service.tags(scope, *id).await?)
        }
    }
}

/// `--x value` sets, `--clear-x` clears, neither keeps the stored value.
fn nullable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}
