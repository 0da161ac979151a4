//! Command parsing, execution and reply formatting.
//!
//! Execution is synchronous and free of Telegram types, so every command
//! can be exercised against an in-memory store.

use stb_core::{
    domain::{DeliveryStatus, Provider, Shipment},
    errors::Error,
    store::ShipmentStore,
    tracking::TrackingEngine,
};

const GREETING: &str = "Hi! I'm a shipment tracking bot.";
const UNRECOGNIZED: &str = "Sorry, I didn't understand that command.";

const HELP: &str = "Available commands:
/start: Start the bot.
/help: Show this help message.
/add_shipment code provider: Add a new shipment and start tracking it.
/ongoing_shipments: List all shipments that are not delivered yet.
/track id_or_code: Show a shipment by its id or tracking code.
/status id_or_code [status]: Show a shipment's status, or update it (\"true\" marks it delivered).
/providers: List all registered shipping providers.
/add_provider name url: Register a new shipping provider.";

#[derive(Clone, Debug)]
pub(crate) struct Reply {
    pub text: String,
    pub markdown: bool,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
        }
    }

    fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
        }
    }
}

pub(crate) fn unrecognized() -> Reply {
    Reply::plain(UNRECOGNIZED)
}

/// Split `/cmd@botname arg1 arg2` into the keyword (case preserved; command
/// keywords are case-sensitive) and its whitespace-delimited arguments.
pub(crate) fn parse_command(text: &str) -> (String, Vec<String>) {
    let mut parts = text.trim().split_whitespace();
    let first = parts.next().unwrap_or("");

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_string();

    (cmd, parts.map(|s| s.to_string()).collect())
}

pub(crate) fn execute(
    store: &ShipmentStore,
    engine: &TrackingEngine,
    command: &str,
    args: &[&str],
) -> Reply {
    match command {
        "start" => Reply::plain(GREETING),
        "help" => Reply::plain(HELP),
        "add_shipment" => add_shipment(engine, args),
        "track" => track(store, args),
        "status" => status(store, engine, args),
        "providers" => providers(store),
        "add_provider" => add_provider(store, args),
        "ongoing_shipments" => ongoing_shipments(engine),
        _ => unrecognized(),
    }
}

/// One mapping from internal failure to user-visible reply, shared by all
/// handlers. Nothing a handler returns may terminate the dispatch loop.
fn reply_for_error(err: &Error) -> Reply {
    match err {
        Error::NotFound(_) => Reply::plain("Shipment not found."),
        Error::UnknownProvider(name) => {
            Reply::plain(format!("Error adding shipment: unknown provider '{name}'."))
        }
        Error::DuplicateProvider(name) => {
            Reply::plain(format!("Provider '{name}' already exists."))
        }
        Error::InvalidInput(reason) => Reply::plain(format!("Invalid input: {reason}.")),
        _ => Reply::plain("Something went wrong, please try again."),
    }
}

fn add_shipment(engine: &TrackingEngine, args: &[&str]) -> Reply {
    if args.len() < 2 {
        return Reply::markdown("Usage: `/add_shipment code provider`");
    }
    match engine.register_shipment(args[0], args[1]) {
        Ok(id) => Reply::markdown(format!("Shipment added with ID:\n```\n{id}\n```")),
        Err(e) => reply_for_error(&e),
    }
}

fn track(store: &ShipmentStore, args: &[&str]) -> Reply {
    let Some(id_or_code) = args.first() else {
        return Reply::markdown("Usage: `/track shipment_id`");
    };
    match store.find_shipment(id_or_code) {
        Ok(Some(shipment)) => shipment_detail(store, &shipment),
        Ok(None) => Reply::plain("Shipment not found."),
        Err(e) => reply_for_error(&e),
    }
}

fn shipment_detail(store: &ShipmentStore, shipment: &Shipment) -> Reply {
    let provider = match store.find_provider(shipment.provider_id) {
        Ok(Some(p)) => p.name,
        _ => format!("#{}", shipment.provider_id.0),
    };
    Reply::markdown(format!(
        "Shipment details:\nID: `{}`\nCode: `{}`\nProvider: `{}`\nStatus: `{}`",
        shipment.id,
        shipment.code,
        provider,
        shipment.status.as_str()
    ))
}

fn status(store: &ShipmentStore, engine: &TrackingEngine, args: &[&str]) -> Reply {
    let Some(id_or_code) = args.first() else {
        return Reply::markdown("Usage: `/status shipment_id [status]`");
    };

    if args.len() == 1 {
        return match store.find_shipment(id_or_code) {
            Ok(Some(shipment)) => Reply::plain(format!(
                "Shipment status for {id_or_code}: {}",
                shipment.status.as_str()
            )),
            Ok(None) => Reply::plain(format!("Shipment with ID '{id_or_code}' not found.")),
            Err(e) => reply_for_error(&e),
        };
    }

    let delivered = DeliveryStatus::from_token(args[1]) == DeliveryStatus::Delivered;
    match engine.report_status_change(id_or_code, delivered) {
        Ok(()) => Reply::plain("Shipment status updated successfully."),
        Err(e) => reply_for_error(&e),
    }
}

fn providers(store: &ShipmentStore) -> Reply {
    match store.list_providers() {
        Ok(providers) if providers.is_empty() => Reply::plain("No providers found."),
        Ok(providers) => {
            let list = providers
                .iter()
                .map(provider_line)
                .collect::<Vec<_>>()
                .join("\n");
            Reply::plain(format!("Available providers:\n{list}"))
        }
        Err(e) => reply_for_error(&e),
    }
}

fn provider_line(p: &Provider) -> String {
    match &p.url {
        Some(url) => format!("{} ({url})", p.name),
        None => p.name.clone(),
    }
}

fn add_provider(store: &ShipmentStore, args: &[&str]) -> Reply {
    if args.len() < 2 {
        return Reply::markdown("Usage: `/add_provider name url`");
    }
    match store.add_provider(args[0], Some(args[1])) {
        Ok(_) => Reply::plain(format!("Provider '{}' added successfully.", args[0])),
        Err(e) => reply_for_error(&e),
    }
}

fn ongoing_shipments(engine: &TrackingEngine) -> Reply {
    match engine.ongoing() {
        Ok(shipments) if shipments.is_empty() => Reply::plain("No ongoing shipments."),
        Ok(shipments) => {
            let lines = shipments
                .iter()
                .map(|s| format!("{}  {}  {}", s.id, s.code, s.status.as_str()))
                .collect::<Vec<_>>()
                .join("\n");
            Reply::markdown(format!("```\n{lines}\n```"))
        }
        Err(e) => reply_for_error(&e),
    }
}
