use std::{path::Path, sync::Arc};

use api_types::{
    transaction::{ListTransactionsFilters, TransactionStatus},
    wallet::CreateWalletRequest,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use client::{AuthProvider, Client, StaticToken};
use engine::{
    BufferedSink, Currency, ItemRow, Itemization, NewTransaction, ReceiptFlow, SessionGuard,
    category::UNCATEGORIZED,
    members::validate_member_email,
    money::parse_amount,
    notify::NotificationSink,
    session::JsonFileStore,
    transactions::parse_kind,
    wallet::filter_archived,
};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    output,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the signed-in user.
    Me,
    /// List wallets.
    Wallets {
        /// Show archived wallets instead of active ones.
        #[arg(long)]
        archived: bool,
    },
    /// Create a wallet.
    WalletCreate {
        name: String,
        /// ISO code; defaults to the configured currency.
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, default_value = "0")]
        initial_balance: String,
    },
    WalletArchive { id: String },
    WalletUnarchive { id: String },
    WalletDelete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    /// Invite someone to a wallet by email.
    AddMember { wallet: String, email: String },
    /// List transactions.
    Transactions {
        #[arg(long)]
        wallet: Option<String>,
        /// Start date (inclusive).
        #[arg(long)]
        from: Option<String>,
        /// End date (inclusive).
        #[arg(long)]
        to: Option<String>,
        /// EXPENSE, INCOME or TRANSFER.
        #[arg(long = "type")]
        kind: Option<String>,
        /// Free-text search.
        #[arg(long)]
        q: Option<String>,
        /// Include deleted transactions.
        #[arg(long)]
        deleted: bool,
    },
    /// Record a transaction.
    TxCreate {
        /// EXPENSE, INCOME or TRANSFER.
        #[arg(long = "type", default_value = "expense")]
        kind: String,
        amount: String,
        #[arg(long)]
        wallet: Option<String>,
        #[arg(long)]
        from_wallet: Option<String>,
        #[arg(long)]
        to_wallet: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// RFC 3339 timestamp or YYYY-MM-DD; defaults to now.
        #[arg(long)]
        date: Option<String>,
    },
    TxDelete { id: String },
    /// Show or replace the line items of a transaction.
    Split {
        transaction: String,
        /// `name:category:amount[:note]`, repeatable. Without items the
        /// current split is shown.
        #[arg(long = "item")]
        items: Vec<String>,
    },
    /// Remove all line items of a transaction.
    Unsplit {
        transaction: String,
        #[arg(long)]
        yes: bool,
    },
    /// Scan a receipt image and save it as an itemized transaction.
    Receipt {
        wallet: String,
        file: String,
        /// Category for items OCR could not classify.
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        yes: bool,
    },
    /// Lock the session.
    Lock,
    /// Unlock the session after re-checking the access token.
    Unlock,
    /// Lock automatically after this many idle minutes (0 disables).
    AutoLock { minutes: u32 },
}

pub async fn run(command: Command, settings: AppConfig) -> Result<()> {
    let now = Utc::now();
    let mut guard = SessionGuard::new(JsonFileStore::load(&settings.state_path)?);
    if guard.tick(now)? {
        eprintln!("Session locked after inactivity.");
    }
    if guard.is_locked() && !matches!(command, Command::Unlock) {
        return Err(AppError::Locked);
    }
    guard.record_activity(now)?;

    let notifier = BufferedSink::new();
    notifier.attach(Arc::new(output::ConsoleSink));
    let notifier: Arc<dyn NotificationSink> = Arc::new(notifier);

    let client = Client::new(
        &settings.base_url,
        StaticToken::new(settings.token.clone()),
    )?;

    match command {
        Command::Me => {
            let profile = client.me().await?;
            output::print_profile(&profile, &client.auth().roles());
        }
        Command::Wallets { archived } => {
            let wallets = client.wallets().await?;
            let profile = client.me().await.ok();
            let shown = filter_archived(&wallets, archived);
            if shown.is_empty() {
                println!("No wallets.");
            }
            for wallet in shown {
                output::print_wallet(wallet, profile.as_ref());
            }
        }
        Command::WalletCreate {
            name,
            currency,
            initial_balance,
        } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Usage("wallet name is required".to_string()));
            }
            let currency = match currency {
                Some(code) => Currency::try_from(code.as_str())?,
                None => settings.currency()?,
            };
            let request = CreateWalletRequest {
                name,
                currency: currency.code().to_string(),
                initial_balance: parse_amount(&initial_balance)?,
            };
            let wallet = client.create_wallet(&request).await?;
            notifier.success(&format!("Wallet '{}' created", wallet.name));
            output::print_wallet(&wallet, None);
        }
        Command::WalletArchive { id } => {
            client.archive_wallet(&id).await?;
            notifier.success("Wallet archived");
        }
        Command::WalletUnarchive { id } => {
            client.unarchive_wallet(&id).await?;
            notifier.success("Wallet restored");
        }
        Command::WalletDelete { id, yes } => {
            if !output::confirm("Delete this wallet and its transactions?", yes) {
                return Err(AppError::Usage("Cancelled".to_string()));
            }
            client.delete_wallet(&id).await?;
            notifier.success("Wallet deleted");
        }
        Command::AddMember { wallet, email } => {
            let email = validate_member_email(&email)?;
            client.add_wallet_member(&wallet, email).await?;
            notifier.success(&format!("{email} added to wallet"));
        }
        Command::Transactions {
            wallet,
            from,
            to,
            kind,
            q,
            deleted,
        } => {
            let filters = ListTransactionsFilters {
                wallet_id: wallet,
                from,
                to,
                kind: kind.as_deref().map(parse_kind).transpose()?,
                q,
                status: deleted.then_some(TransactionStatus::Deleted),
            };
            let list = client.list_transactions(&filters).await?;
            if list.items.is_empty() {
                println!("No transactions.");
            }
            for tx in &list.items {
                output::print_transaction(tx);
            }
            println!(
                "income {:.2}  expense {:.2}  net {:.2}",
                list.totals.total_income, list.totals.total_expense, list.totals.net
            );
        }
        Command::TxCreate {
            kind,
            amount,
            wallet,
            from_wallet,
            to_wallet,
            category,
            description,
            date,
        } => {
            let transaction_date = match date {
                Some(date) => parse_date(&date)?,
                None => now,
            };
            let mut tx = NewTransaction::new(parse_kind(&kind)?, parse_amount(&amount)?, transaction_date);
            tx.wallet_id = wallet;
            tx.from_wallet_id = from_wallet;
            tx.to_wallet_id = to_wallet;
            tx.category = category;
            tx.description = description;
            let created = client.create_transaction(&tx.into_request()?).await?;
            notifier.success("Transaction created");
            output::print_transaction(&created);
        }
        Command::TxDelete { id } => {
            client.delete_transaction(&id).await?;
            notifier.success("Transaction deleted");
        }
        Command::Split { transaction, items } => {
            let mut split = Itemization::new(Arc::clone(&notifier));
            open_itemization(&mut split, &client, &transaction).await?;
            if items.is_empty() {
                output::print_itemization(&split);
                return Ok(());
            }

            while split.remove_item(0).is_some() {}
            for spec in &items {
                split.add_item(Some(parse_item(spec)?));
            }
            output::print_itemization(&split);
            split.submit(&client).await?;
        }
        Command::Unsplit { transaction, yes } => {
            let mut split = Itemization::new(Arc::clone(&notifier));
            open_itemization(&mut split, &client, &transaction).await?;
            output::print_itemization(&split);
            split
                .reset_to_single(&client, |question| output::confirm(question, yes))
                .await?;
        }
        Command::Receipt {
            wallet,
            file,
            category,
            yes,
        } => {
            let bytes = tokio::fs::read(&file).await?;
            let file_name = Path::new(&file)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("receipt")
                .to_string();

            let mut flow = ReceiptFlow::new(settings.currency()?);
            flow.upload(&client, &file_name, bytes, now).await?;

            if let Some(form) = flow.form_mut() {
                form.wallet_id = wallet;
                let fallback = category.as_deref().unwrap_or(UNCATEGORIZED);
                for row in form.items.iter_mut().filter(|row| row.category.trim().is_empty()) {
                    row.category = fallback.to_string();
                }
                println!("{}", form.description);
                for row in &form.items {
                    let amount = row.amount.unwrap_or_default();
                    println!("  {:<24} {:<16} {:>12}", row.name, row.category, output::money(amount, &form.currency));
                }
                let total = form.total_amount.unwrap_or_default();
                println!("  total {}", output::money(total, &form.currency));
            }

            if !output::confirm("Save this receipt?", yes) {
                flow.cancel();
                return Err(AppError::Usage("Cancelled".to_string()));
            }
            let transaction_id = flow.confirm(&client).await?;
            notifier.success(&format!("Receipt saved as transaction {transaction_id}"));
        }
        Command::Lock => {
            guard.lock()?;
            println!("Locked.");
        }
        Command::Unlock => {
            if !guard.is_locked() {
                println!("Not locked.");
                return Ok(());
            }
            client.me().await?;
            guard.unlock(now)?;
            println!("Unlocked.");
        }
        Command::AutoLock { minutes } => {
            guard.set_auto_lock(minutes, now)?;
            if minutes == 0 {
                println!("Auto-lock disabled.");
            } else {
                println!("Auto-lock after {minutes} idle minutes.");
            }
        }
    }

    Ok(())
}

/// Fetches the transaction's detail and opens it for editing.
async fn open_itemization<A: AuthProvider>(
    split: &mut Itemization,
    client: &Client<A>,
    transaction_id: &str,
) -> Result<()> {
    let detail = client.get_transaction_detail(transaction_id).await?;
    let ticket = split.begin_load(detail.transaction.clone());
    split.apply_loaded(ticket, Ok(detail));
    Ok(())
}

/// Parses `name:category:amount[:note]`.
fn parse_item(spec: &str) -> Result<ItemRow> {
    let mut parts = spec.splitn(4, ':');
    let (Some(name), Some(category), Some(amount)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Usage(format!(
            "invalid item '{spec}', expected name:category:amount[:note]"
        )));
    };
    let mut row = ItemRow::new(name.trim(), category.trim(), parse_amount(amount)?);
    if let Some(note) = parts.next() {
        row.note = note.trim().to_string();
    }
    Ok(row)
}

fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| AppError::Usage(format!("invalid date '{value}'")))
}
