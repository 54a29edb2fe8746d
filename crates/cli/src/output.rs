//! Terminal presentation.

use std::io::{self, BufRead, Write};

use api_types::{transaction::TransactionResponse, user::UserProfile};
use engine::{Currency, Itemization, NotificationSink, Toast, ToastLevel, Wallet, transactions};
use rust_decimal::Decimal;

/// Prints toasts to the terminal.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, toast: Toast) {
        tracing::debug!("toast {:?}: {}", toast.level, toast.message);
        match toast.level {
            ToastLevel::Error | ToastLevel::Warning => {
                eprintln!("{}: {}", toast.title, toast.message);
            }
            ToastLevel::Info | ToastLevel::Success => println!("{}", toast.message),
        }
    }
}

pub fn money(amount: Decimal, currency: &str) -> String {
    match Currency::try_from(currency) {
        Ok(currency) => currency.format(amount),
        Err(_) => format!("{amount:.2} {currency}"),
    }
}

fn optional_money(amount: Option<Decimal>, currency: Option<Currency>) -> String {
    match (amount, currency) {
        (Some(amount), Some(currency)) => currency.format(amount),
        (Some(amount), None) => format!("{amount:.2}"),
        (None, _) => "-".to_string(),
    }
}

pub fn print_profile(profile: &UserProfile, roles: &[String]) {
    let name = [profile.first_name.as_deref(), profile.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    println!("id:       {}", profile.id.as_deref().unwrap_or("-"));
    println!("username: {}", profile.preferred_username.as_deref().unwrap_or("-"));
    println!("email:    {}", profile.email.as_deref().unwrap_or("-"));
    if !name.is_empty() {
        println!("name:     {name}");
    }
    if !roles.is_empty() {
        println!("roles:    {}", roles.join(", "));
    }
}

pub fn print_wallet(wallet: &Wallet, profile: Option<&UserProfile>) {
    let mut flags = Vec::new();
    if wallet.is_archived() {
        flags.push("archived");
    }
    if let Some(profile) = profile {
        if wallet.is_owner(profile) {
            flags.push("owner");
        } else if !wallet.can_write(Some(profile)) {
            flags.push("read-only");
        }
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    println!(
        "{:<38} {:<20} {:>16}{flags}",
        wallet.id,
        wallet.name,
        optional_money(wallet.current_balance, wallet.currency),
    );
}

pub fn print_transaction(tx: &TransactionResponse) {
    let date = tx.transaction_date.get(..10).unwrap_or(&tx.transaction_date);
    println!(
        "{} {date} {:<38} {:<8} {:>14}  {} {}",
        transactions::glyph(tx),
        tx.id,
        tx.kind.as_str(),
        money(tx.amount, &tx.currency),
        tx.category.as_deref().unwrap_or(""),
        tx.description.as_deref().unwrap_or(""),
    );
}

pub fn print_itemization(split: &Itemization) {
    let currency = split
        .transaction()
        .map(|tx| tx.currency.clone())
        .unwrap_or_default();
    for (index, row) in split.rows().iter().enumerate() {
        let amount = row
            .amount
            .map_or_else(|| "?".to_string(), |amount| money(amount, &currency));
        let note = if row.note.is_empty() {
            String::new()
        } else {
            format!("  ({})", row.note)
        };
        println!(
            "{:>3}. {:<24} {:<16} {:>14}{note}",
            index + 1,
            row.name,
            row.category,
            amount
        );
    }
    println!(
        "allocated {} of {}, remaining {}{}",
        split
            .allocated_total()
            .map_or_else(|| "?".to_string(), |amount| money(amount, &currency)),
        money(split.total(), &currency),
        split
            .remaining()
            .map_or_else(|| "?".to_string(), |amount| money(amount, &currency)),
        if split.is_balanced() { "" } else { " (not balanced)" },
    );
}

/// Asks a yes/no question on the terminal; anything but `y`/`yes` is a no.
pub fn confirm(question: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    print!("{question} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
