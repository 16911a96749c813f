use crate::ingest::IngestReport;
use crate::storage::ConnectionStatus;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn connection_status(url: &str, status: &ConnectionStatus) {
    match status {
        ConnectionStatus::Connected => {
            println!("{} {} {}", Icons::PLUG, url.style(theme().dim.clone()), "connected".style(theme().success.clone()));
        }
        ConnectionStatus::Unreachable(reason) => {
            eprintln!("{} {} {}", Icons::PLUG, url.style(theme().dim.clone()), "unreachable".style(theme().error.clone()));
            eprintln!("   {}", reason.style(theme().dim.clone()));
        }
    }
}

pub fn ingest_summary(report: &IngestReport) {
    println!(
        "  {} {}  {} {}  {} {}  {} {}",
        Icons::DEBTOR,
        report.debtors,
        Icons::COMPANY,
        report.companies,
        Icons::PERSON,
        report.employees,
        Icons::TAG,
        report.tags_linked,
    );
}

pub fn timing(elapsed: &str) {
    println!("{} {}", Icons::CLOCK.style(theme().dim.clone()), elapsed);
}
